use crate::schema::Schema;

/// Immutable input bundle for AI-assisted conversion of one template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionContext {
    pub template_text: String,
    pub query_text: Option<String>,
    pub schema: Option<Schema>,
    pub custom_instructions: Option<String>,
}

impl ConversionContext {
    pub fn new(template_text: impl Into<String>) -> Self {
        Self {
            template_text: template_text.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_query(mut self, query_text: Option<String>) -> Self {
        self.query_text = query_text.filter(|text| !text.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_schema(mut self, schema: Option<Schema>) -> Self {
        self.schema = schema;
        self
    }

    #[must_use]
    pub fn with_instructions(mut self, instructions: Option<String>) -> Self {
        self.custom_instructions = instructions.filter(|text| !text.trim().is_empty());
        self
    }

    /// Schema field names in sorted order, empty without a schema.
    pub fn schema_fields(&self) -> Vec<&str> {
        self.schema
            .as_ref()
            .map(|schema| schema.field_names().collect())
            .unwrap_or_default()
    }
}
