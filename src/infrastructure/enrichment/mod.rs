//! Click enrichment adapters.
//!
//! [`DefaultClickEnricher`] combines the optional GeoIP database with the
//! user-agent classifier. Each step fails independently.

pub mod geoip;
pub mod user_agent;

pub use geoip::{GeoIpService, GeoLocation};
pub use user_agent::{UserAgentInfo, classify};

use std::net::IpAddr;
use tracing::debug;

use crate::domain::click_event::ClickEvent;
use crate::domain::entities::ClickEnrichment;
use crate::domain::enrichment::ClickEnricher;

#[derive(Clone, Default)]
pub struct DefaultClickEnricher {
    geoip: Option<GeoIpService>,
}

impl DefaultClickEnricher {
    pub fn new(geoip: Option<GeoIpService>) -> Self {
        Self { geoip }
    }
}

impl ClickEnricher for DefaultClickEnricher {
    fn enrich(&self, event: &ClickEvent) -> ClickEnrichment {
        let mut enrichment = ClickEnrichment::default();

        if let (Some(geoip), Some(raw_ip)) = (&self.geoip, event.ip.as_deref()) {
            match raw_ip.parse::<IpAddr>() {
                Ok(ip) => {
                    let location = geoip.lookup(ip);
                    enrichment.country = location.country;
                    enrichment.city = location.city;
                }
                Err(_) => debug!(ip = raw_ip, "Skipping GeoIP for unparseable address"),
            }
        }

        if let Some(ua) = event.user_agent.as_deref() {
            let info = classify(ua);
            enrichment.browser = info.browser;
            enrichment.os = info.os;
            enrichment.device = info.device;
        }

        enrichment
    }
}
