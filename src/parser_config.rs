/// Configuration options for the pptx import.
///
/// Use [`ParserConfig::builder()`] to create a configuration instance.
/// This allows you to customize only the desired fields while falling back to sensible defaults for the rest.
///
/// # Configuration Options
///
/// | Parameter | Type | Default | Description |
/// |-----------|------|---------|-------------|
/// | `extract_images` | `bool` | `true` | Whether pictures are embedded into the scene as `Image` objects |
/// | `detect_ellipses` | `bool` | `false` | Whether text-less shapes with an `ellipse` preset become `Ellipse` instead of `Rectangle` |
///
/// # Example
///
/// ```
/// use slidecodec::ParserConfig;
///
/// let config = ParserConfig::builder()
///     .extract_images(true)
///     .detect_ellipses(true)
///     .build();
/// assert!(config.detect_ellipses);
/// ```
#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub extract_images: bool,
    pub detect_ellipses: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            extract_images: true,
            detect_ellipses: false,
        }
    }
}

impl ParserConfig {
    pub fn builder() -> ParserConfigBuilder {
        ParserConfigBuilder::default()
    }
}

/// Builder for [`ParserConfig`].
///
/// Allows setting individual configuration fields while falling back to defaults for any unspecified values
#[derive(Debug, Default)]
pub struct ParserConfigBuilder {
    extract_images: Option<bool>,
    detect_ellipses: Option<bool>,
}

impl ParserConfigBuilder {
    /// Sets whether pictures should be extracted from the slides.
    pub fn extract_images(mut self, value: bool) -> Self {
        self.extract_images = Some(value);
        self
    }

    /// Sets whether `ellipse` preset shapes are imported as ellipses.
    pub fn detect_ellipses(mut self, value: bool) -> Self {
        self.detect_ellipses = Some(value);
        self
    }

    /// Builds the final [`ParserConfig`] instance, applying default values for any fields that were not set.
    pub fn build(self) -> ParserConfig {
        let defaults = ParserConfig::default();
        ParserConfig {
            extract_images: self.extract_images.unwrap_or(defaults.extract_images),
            detect_ellipses: self.detect_ellipses.unwrap_or(defaults.detect_ellipses),
        }
    }
}
