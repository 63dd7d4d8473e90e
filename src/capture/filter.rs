/// URL fragments that mark a response as possibly carrying a round result.
pub const GAME_KEYWORDS: [&str; 17] = [
    "bet", "spin", "game", "play", "result", "outcome", "win", "lose", "jackpot", "bonus",
    "round", "turn", "deal", "draw", "coinflip", "limbo", "dice",
];

pub const DEFAULT_WIN_CHANCE: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct CaptureFilter {
    site_origin: String,
    keywords: Vec<String>,
}

impl CaptureFilter {
    pub fn new(site_origin: impl Into<String>, keywords: &[String]) -> Self {
        Self {
            site_origin: site_origin.into(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    pub fn site_origin(&self) -> &str {
        &self.site_origin
    }

    pub fn is_target_site(&self, page_url: &str) -> bool {
        page_url.starts_with(&self.site_origin)
    }

    pub fn is_game_related_url(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        self.keywords.iter().any(|keyword| lower.contains(keyword.as_str()))
    }

    // Responses without a reported content type are given the benefit of the doubt.
    pub fn is_json_content(&self, content_type: Option<&str>) -> bool {
        content_type.map_or(true, |ct| ct.to_lowercase().contains("application/json"))
    }
}

pub fn default_keywords() -> Vec<String> {
    GAME_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

/// Reads the win-chance input like a browser `parseFloat`: the longest
/// numeric prefix wins, and an unreadable or zero value means the default.
pub fn parse_win_chance(input: &str) -> f64 {
    let trimmed = input.trim_start();
    let candidate_len = trimmed
        .char_indices()
        .find(|&(_, c)| !matches!(c, '0'..='9' | '+' | '-' | '.' | 'e' | 'E'))
        .map_or(trimmed.len(), |(i, _)| i);

    let parsed = (1..=candidate_len)
        .rev()
        .find_map(|len| trimmed[..len].parse::<f64>().ok())
        .filter(|value| value.is_finite() && *value != 0.0);

    parsed.unwrap_or(DEFAULT_WIN_CHANCE)
}
