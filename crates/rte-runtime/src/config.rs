use rte_core::{
    ChartUrlBuilder, HistoryCodec, DEFAULT_HISTORY_NAMESPACE, DEFAULT_SPARKLINE_URL_TEMPLATE,
};
use rte_tracker::GithubProviderConfig;

pub const DEFAULT_NOTIFY_FROM: &str = "runtimeerror@localhost";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Settings shared by the registry, lifecycle controller and dispatcher.
pub struct RuntimeConfig {
    pub sparkline_url_template: String,
    pub history_namespace: String,
    /// 0 keeps the full history; 7 keeps the trailing week.
    pub history_retention_days: u32,
    pub github: GithubProviderConfig,
    pub notify_from: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            sparkline_url_template: DEFAULT_SPARKLINE_URL_TEMPLATE.to_string(),
            history_namespace: DEFAULT_HISTORY_NAMESPACE.to_string(),
            history_retention_days: 0,
            github: GithubProviderConfig::default(),
            notify_from: DEFAULT_NOTIFY_FROM.to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn history_codec(&self) -> HistoryCodec {
        HistoryCodec::new(
            self.history_namespace.clone(),
            ChartUrlBuilder::new(self.sparkline_url_template.clone()),
        )
        .with_retention_days(self.history_retention_days)
    }
}
