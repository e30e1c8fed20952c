//! Static knowledge providers and the toolbox that exposes them to the model.
//!
//! Each provider is zero-argument and infallible; values are fixed clinic data.

use crate::agent::ToolExecutor;
use crate::llm::{ToolDefinition, ToolFunctionDefinition};
use serde_json::{json, Value};

/// Tool result fed back to the model when it asks for a tool we do not have.
pub const UNAVAILABLE_TOOL_REPLY: &str = "Función no disponible";

/// A zero-argument capability the model can invoke by name.
pub trait KnowledgeProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn produce(&self) -> Value;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            typ: "function".to_string(),
            function: ToolFunctionDefinition {
                name: self.name().to_string(),
                description: Some(self.description().to_string()),
                parameters: json!({ "type": "object", "properties": {} }),
            },
        }
    }
}

/// Service name -> price.
pub struct Prices;

impl KnowledgeProvider for Prices {
    fn name(&self) -> &'static str {
        "get_precios"
    }

    fn description(&self) -> &'static str {
        "Devuelve los precios actuales de los servicios de la clínica veterinaria"
    }

    fn produce(&self) -> Value {
        json!({
            "consulta_general": "$15.000",
            "vacunación": "$10.000",
            "urgencia": "$25.000"
        })
    }
}

/// Street address of the clinic.
pub struct Location;

impl KnowledgeProvider for Location {
    fn name(&self) -> &'static str {
        "get_ubicacion"
    }

    fn description(&self) -> &'static str {
        "Devuelve la dirección de la clínica veterinaria"
    }

    fn produce(&self) -> Value {
        Value::String("Av. Los Leones 1234, Providencia, Santiago.".to_string())
    }
}

/// Day range -> opening hours.
pub struct Hours;

impl KnowledgeProvider for Hours {
    fn name(&self) -> &'static str {
        "get_horarios"
    }

    fn description(&self) -> &'static str {
        "Devuelve los horarios de atención de la clínica veterinaria"
    }

    fn produce(&self) -> Value {
        json!({
            "lunes_a_viernes": "9:00 a 19:00",
            "sábado": "9:00 a 13:00"
        })
    }
}

/// The fixed set of providers offered to the model on every first query.
pub struct ClinicToolbox {
    providers: Vec<Box<dyn KnowledgeProvider>>,
}

impl Default for ClinicToolbox {
    fn default() -> Self {
        Self::new()
    }
}

impl ClinicToolbox {
    pub fn new() -> Self {
        Self {
            providers: vec![Box::new(Prices), Box::new(Location), Box::new(Hours)],
        }
    }

    /// Tool definitions in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.providers.iter().map(|p| p.definition()).collect()
    }

    /// Exact-name lookup.
    pub fn get(&self, name: &str) -> Option<&dyn KnowledgeProvider> {
        self.providers
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }
}

impl ToolExecutor for ClinicToolbox {
    fn execute(&self, name: &str, _args: &str) -> Result<Value, String> {
        self.get(name)
            .map(|p| p.produce())
            .ok_or_else(|| format!("unknown tool: {}", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definitions_cover_three_zero_argument_tools() {
        let defs = ClinicToolbox::new().definitions();
        let names: Vec<&str> = defs.iter().map(|d| d.function.name.as_str()).collect();
        assert_eq!(names, vec!["get_precios", "get_ubicacion", "get_horarios"]);
        for d in &defs {
            assert_eq!(d.typ, "function");
            assert_eq!(d.function.parameters, json!({"type": "object", "properties": {}}));
            assert!(d.function.description.is_some());
        }
    }

    #[test]
    fn prices_keep_insertion_order_when_serialized() {
        let s = serde_json::to_string(&Prices.produce()).unwrap();
        assert_eq!(
            s,
            r#"{"consulta_general":"$15.000","vacunación":"$10.000","urgencia":"$25.000"}"#
        );
    }

    #[test]
    fn execute_dispatches_by_exact_name() {
        let toolbox = ClinicToolbox::new();
        assert_eq!(
            toolbox.execute("get_ubicacion", "{}").unwrap(),
            Value::String("Av. Los Leones 1234, Providencia, Santiago.".to_string())
        );
        assert_eq!(
            toolbox.execute("get_horarios", "").unwrap()["sábado"],
            "9:00 a 13:00"
        );
        assert!(toolbox.execute("GET_PRECIOS", "{}").is_err());
        assert!(toolbox.execute("get_clima", "{}").is_err());
    }

    #[test]
    fn providers_are_deterministic() {
        assert_eq!(Hours.produce(), Hours.produce());
        assert_eq!(Prices.produce(), Prices.produce());
    }
}
