/// Callback endpoint settings.
#[derive(Debug, Clone, Default)]
pub struct CallbackConfig {
    /// When set, callbacks must carry `?token=<value>`.
    pub token: Option<String>,
}
