/// Configuration options for the export.
///
/// | Parameter | Type | Default | Description |
/// |-----------|------|---------|-------------|
/// | `placeholder_text` | `String` | `"Empty Slide"` | Text written onto slides that have no objects |
/// | `author` | `String` | `"slidecodec"` | Creator recorded in the package's core properties and the PDF info |
///
/// # Example
///
/// ```
/// use slidecodec::ExportConfig;
///
/// let config = ExportConfig::builder()
///     .placeholder_text("Nothing here yet")
///     .build();
/// assert_eq!(config.placeholder_text, "Nothing here yet");
/// ```
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub placeholder_text: String,
    pub author: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            placeholder_text: "Empty Slide".to_string(),
            author: "slidecodec".to_string(),
        }
    }
}

impl ExportConfig {
    pub fn builder() -> ExportConfigBuilder {
        ExportConfigBuilder::default()
    }
}

/// Builder for [`ExportConfig`].
#[derive(Debug, Default)]
pub struct ExportConfigBuilder {
    placeholder_text: Option<String>,
    author: Option<String>,
}

impl ExportConfigBuilder {
    pub fn placeholder_text(mut self, value: impl Into<String>) -> Self {
        self.placeholder_text = Some(value.into());
        self
    }

    pub fn author(mut self, value: impl Into<String>) -> Self {
        self.author = Some(value.into());
        self
    }

    pub fn build(self) -> ExportConfig {
        let defaults = ExportConfig::default();
        ExportConfig {
            placeholder_text: self.placeholder_text.unwrap_or(defaults.placeholder_text),
            author: self.author.unwrap_or(defaults.author),
        }
    }
}
