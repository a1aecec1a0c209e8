//! Coarse user-agent classification.
//!
//! Pattern order matters: Edge and Opera embed "Chrome", Chrome embeds
//! "Safari", and Android embeds "Linux".

use regex::Regex;
use std::sync::LazyLock;

static BOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)bot|crawler|spider|slurp|curl|wget|httpclient").expect("bot pattern is valid")
});

static BROWSERS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"Edg(e|A|iOS)?/", "Edge"),
        (r"OPR/|Opera", "Opera"),
        (r"Firefox/|FxiOS/", "Firefox"),
        (r"Chrome/|CriOS/", "Chrome"),
        (r"Safari/", "Safari"),
        (r"(?i)curl/", "curl"),
    ]
    .into_iter()
    .map(|(pattern, name)| {
        (
            Regex::new(pattern).expect("user-agent pattern is valid"),
            name,
        )
    })
    .collect()
});

static OPERATING_SYSTEMS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"Windows NT", "Windows"),
        (r"iPhone|iPad|iPod", "iOS"),
        (r"Mac OS X|Macintosh", "macOS"),
        (r"Android", "Android"),
        (r"CrOS", "ChromeOS"),
        (r"Linux", "Linux"),
    ]
    .into_iter()
    .map(|(pattern, name)| {
        (
            Regex::new(pattern).expect("user-agent pattern is valid"),
            name,
        )
    })
    .collect()
});

static TABLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"iPad|Tablet").expect("tablet pattern is valid"));
static MOBILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Mobi|iPhone|iPod|Android").expect("mobile pattern is valid"));

/// Browser, OS and device class derived from a `User-Agent` header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserAgentInfo {
    pub browser: Option<String>,
    pub os: Option<String>,
    pub device: Option<String>,
}

pub fn classify(user_agent: &str) -> UserAgentInfo {
    let user_agent = user_agent.trim();
    if user_agent.is_empty() {
        return UserAgentInfo::default();
    }

    let browser = BROWSERS
        .iter()
        .find(|(re, _)| re.is_match(user_agent))
        .map(|(_, name)| name.to_string());

    let os = OPERATING_SYSTEMS
        .iter()
        .find(|(re, _)| re.is_match(user_agent))
        .map(|(_, name)| name.to_string());

    let device = if BOT.is_match(user_agent) {
        "bot"
    } else if TABLET.is_match(user_agent) {
        "tablet"
    } else if MOBILE.is_match(user_agent) {
        "mobile"
    } else {
        "desktop"
    };

    UserAgentInfo {
        browser,
        os,
        device: Some(device.to_string()),
    }
}
