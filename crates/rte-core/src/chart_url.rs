use std::sync::OnceLock;

use regex::{Captures, Regex};

pub const DEFAULT_SPARKLINE_URL_TEMPLATE: &str = "http://sparklines-bitworking.appspot.com/spark.cgi?type=impulse&height=40&upper={MAX}&above-color=red&below-color=gray&width=5&limits={MIN},{MAX}&d={RAW}";

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([^{}]*)\}").expect("placeholder pattern is valid"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Renders sparkline image URLs from a `{MIN}`/`{MAX}`/`{RAW}` template.
pub struct ChartUrlBuilder {
    template: String,
}

impl Default for ChartUrlBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_SPARKLINE_URL_TEMPLATE)
    }
}

impl ChartUrlBuilder {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Substitute the count sequence into the template.
    ///
    /// Unknown placeholders render as an empty string.
    pub fn build_url(&self, values: &[u64]) -> String {
        let max = values.iter().copied().max().unwrap_or(0).to_string();
        let raw = values
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        placeholder_pattern()
            .replace_all(&self.template, |captures: &Captures<'_>| {
                match &captures[1] {
                    "MIN" => "0".to_string(),
                    "MAX" => max.clone(),
                    "RAW" => raw.clone(),
                    _ => String::new(),
                }
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::{ChartUrlBuilder, DEFAULT_SPARKLINE_URL_TEMPLATE};

    #[test]
    fn unit_build_url_fills_default_template() {
        let url = ChartUrlBuilder::default().build_url(&[0, 3, 0, 7, 2]);
        assert_eq!(
            url,
            "http://sparklines-bitworking.appspot.com/spark.cgi?type=impulse&height=40&upper=7&above-color=red&below-color=gray&width=5&limits=0,7&d=0,3,0,7,2"
        );
    }

    #[test]
    fn unit_build_url_blanks_unknown_placeholders() {
        let builder = ChartUrlBuilder::new("https://chart.test/{MIN}-{MAX}/{WAT}?d={RAW}&x={}");
        assert_eq!(builder.build_url(&[4, 1]), "https://chart.test/0-4/?d=4,1&x=");
    }

    #[test]
    fn regression_build_url_handles_empty_sequence() {
        let builder = ChartUrlBuilder::new("{MIN}|{MAX}|{RAW}");
        assert_eq!(builder.build_url(&[]), "0|0|");
        assert_eq!(builder.template(), "{MIN}|{MAX}|{RAW}");
        assert_ne!(builder.template(), DEFAULT_SPARKLINE_URL_TEMPLATE);
    }
}
