//! Overlay layer drawn over the presented frame

mod scroller;

pub use scroller::{TextScroller, DEFAULT_SPEED};

use crate::config::RemoteConfig;

/// Build the scroller from the enabled `tickertext` entry, if any
pub fn from_config(config: &RemoteConfig) -> Option<TextScroller> {
    let ticker = config.ticker()?;
    Some(TextScroller::new(
        ticker.content.clone().unwrap_or_default(),
        ticker.speed.filter(|s| s.is_finite()).unwrap_or(DEFAULT_SPEED),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_needs_enabled_ticker() {
        let none = RemoteConfig::from_json(r#"{ "overlays": [{ "type": "tickertext", "enabled": false }] }"#)
            .expect("config");
        assert!(from_config(&none).is_none());

        let some = RemoteConfig::from_json(r#"{ "overlays": [{ "type": "tickertext", "content": "YO" }] }"#)
            .expect("config");
        let scroller = from_config(&some).expect("scroller");
        assert_eq!(scroller.message(), "YO");
        assert_eq!(scroller.speed(), DEFAULT_SPEED);
    }
}
