//! GeoIP lookup backed by a memory-mapped MaxMind City database.

use anyhow::{Context, Result};
use maxminddb::{Mmap, Reader, geoip2};
use std::net::IpAddr;
use std::sync::Arc;

/// Country and city names resolved for an address.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoLocation {
    pub country: Option<String>,
    pub city: Option<String>,
}

/// Thread-safe GeoIP reader. Cloning shares the mapped database.
#[derive(Clone)]
pub struct GeoIpService {
    reader: Arc<Reader<Mmap>>,
}

impl GeoIpService {
    /// Opens a GeoLite2-City or GeoIP2-City `.mmdb` file.
    pub fn open(path: &str) -> Result<Self> {
        let reader = unsafe { Reader::open_mmap(path) }
            .with_context(|| format!("Failed to open GeoIP City database at {}", path))?;

        Ok(Self {
            reader: Arc::new(reader),
        })
    }

    /// Looks up an address. Unknown or private addresses yield empty fields.
    pub fn lookup(&self, ip: IpAddr) -> GeoLocation {
        let mut location = GeoLocation::default();

        if let Ok(result) = self.reader.lookup(ip) {
            if let Ok(Some(city)) = result.decode::<geoip2::City>() {
                location.country = city.country.names.english.map(|s| s.to_string());
                location.city = city.city.names.english.map(|s| s.to_string());
            }
        }

        location
    }
}
