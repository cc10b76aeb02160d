use syncer_config::ClientConfig;

/// 测试用客户端配置构建器
#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig {
                endpoint: "https://external-service.local".to_string(),
                buffer_input: 50,
                buffer_batch: 10,
                buffer_resort: 3,
                check_status_interval_ms: 5000,
                max_resubmissions: None,
                shutdown_timeout_seconds: 5,
            },
        }
    }

    pub fn with_buffers(mut self, input: usize, batch: usize, resort: usize) -> Self {
        self.config.buffer_input = input;
        self.config.buffer_batch = batch;
        self.config.buffer_resort = resort;
        self
    }

    pub fn with_check_status_interval_ms(mut self, interval_ms: u64) -> Self {
        self.config.check_status_interval_ms = interval_ms;
        self
    }

    pub fn with_max_resubmissions(mut self, max: u32) -> Self {
        self.config.max_resubmissions = Some(max);
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
