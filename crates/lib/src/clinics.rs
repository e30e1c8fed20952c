//! Static clinic directory served to the web front end.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Clinic {
    pub id: u32,
    #[serde(rename = "nombre")]
    pub name: &'static str,
    #[serde(rename = "comuna")]
    pub district: &'static str,
}

const CLINICS: [Clinic; 3] = [
    Clinic {
        id: 1,
        name: "Clínica Arrayán",
        district: "Providencia",
    },
    Clinic {
        id: 2,
        name: "Clínica Andes",
        district: "Vitacura",
    },
    Clinic {
        id: 3,
        name: "Clínica Centro",
        district: "Santiago Centro",
    },
];

/// All clinics, in id order.
pub fn all_clinics() -> Vec<Clinic> {
    CLINICS.to_vec()
}
