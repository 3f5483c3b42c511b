//! Verification Context: state shared read-only by every device task
use crate::config::VerifyConfig;
use crate::layout::DesignLayout;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct VerifyContext {
    pub run_id: String,
    pub design: String,
    pub started_at: DateTime<Utc>,
    pub config: VerifyConfig,
    pub layout: DesignLayout,
}

impl VerifyContext {
    pub fn new(design: impl Into<String>, config: VerifyConfig) -> Self {
        let design = design.into();
        let layout = DesignLayout::new(&config.output_dir, &design);
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            design,
            started_at: Utc::now(),
            config,
            layout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_follows_config() {
        let config = VerifyConfig {
            output_dir: "/srv/netcam".into(),
            ..VerifyConfig::default()
        };
        let ctx = VerifyContext::new("dc1", config);
        assert_eq!(ctx.layout.root(), std::path::Path::new("/srv/netcam/dc1"));
        assert_eq!(ctx.run_id.len(), 36);
    }
}
