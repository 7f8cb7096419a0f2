//! Mapping configuration.
//!
//! `MapperConfig` carries the engine's tunables. Callers that resolve values
//! from several places (defaults, environment, CLI flags) track where each
//! value came from with [`ConfigValue`] and [`ConfigSource`].

/// Fallback body length for methods and functions, in lines.
pub const DEFAULT_CALLABLE_FALLBACK_LINES: u32 = 30;

/// Fallback body length for classes, interfaces, traits and enums, in lines.
pub const DEFAULT_TYPE_FALLBACK_LINES: u32 = 500;

/// Separator placed between namespace segments in FQNs.
pub const DEFAULT_NAMESPACE_SEPARATOR: &str = "\\";

// ============================================================================
// Configuration Sources
// ============================================================================

/// Configuration value source (for precedence tracking).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigSource {
    /// Built-in default value.
    Default = 0,
    /// From environment variable.
    EnvVar = 1,
    /// From CLI flag (highest precedence).
    CliFlag = 2,
}

/// A configuration value with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValue<T> {
    /// The actual value.
    pub value: T,
    /// Where the value came from.
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    /// Create a new config value with the given source.
    pub fn new(value: T, source: ConfigSource) -> Self {
        ConfigValue { value, source }
    }

    /// Merge with another value, preferring higher precedence.
    pub fn merge(self, other: Self) -> Self {
        if other.source >= self.source {
            other
        } else {
            self
        }
    }

    /// Merge with an optional value from a higher layer.
    pub fn merge_opt(self, other: Option<Self>) -> Self {
        match other {
            Some(other) => self.merge(other),
            None => self,
        }
    }
}

// ============================================================================
// Mapper Configuration
// ============================================================================

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapperConfig {
    /// Estimated body length of a trailing method or function.
    pub callable_fallback_lines: u32,
    /// Estimated body length of a trailing type.
    pub type_fallback_lines: u32,
    pub namespace_separator: String,
    /// Link call records into the graph when they are supplied.
    pub link_calls: bool,
    /// Fixed `generated_at` stamp; the current time is used when unset.
    pub generated_at: Option<String>,
    /// Name recorded as the graph's `source_scip`.
    pub source_name: Option<String>,
}

impl Default for MapperConfig {
    fn default() -> Self {
        MapperConfig {
            callable_fallback_lines: DEFAULT_CALLABLE_FALLBACK_LINES,
            type_fallback_lines: DEFAULT_TYPE_FALLBACK_LINES,
            namespace_separator: DEFAULT_NAMESPACE_SEPARATOR.to_string(),
            link_calls: true,
            generated_at: None,
            source_name: None,
        }
    }
}

impl MapperConfig {
    pub fn with_callable_fallback_lines(mut self, lines: u32) -> Self {
        self.callable_fallback_lines = lines;
        self
    }

    pub fn with_type_fallback_lines(mut self, lines: u32) -> Self {
        self.type_fallback_lines = lines;
        self
    }

    pub fn with_namespace_separator(mut self, separator: impl Into<String>) -> Self {
        self.namespace_separator = separator.into();
        self
    }

    pub fn with_link_calls(mut self, link_calls: bool) -> Self {
        self.link_calls = link_calls;
        self
    }

    pub fn with_generated_at(mut self, generated_at: impl Into<String>) -> Self {
        self.generated_at = Some(generated_at.into());
        self
    }

    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }
}
