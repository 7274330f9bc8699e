use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

use crate::domain::ports::{Intent, Reasoner, ReasoningError, SubtaskSpec};
use crate::domain::weather::{lookup_state, Coordinates, WeatherAction, US_STATES};

/// Words dropped from location phrases ("alerts for Texas today please")
const FILLER: &[&str] = &[
    "the", "for", "in", "at", "of", "please", "today", "tonight", "tomorrow", "now", "right",
    "this", "next", "week", "weekend", "state", "me", "us", "currently", "current",
];

fn explicit_coordinates() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)lat(?:itude)?\s*[:=]?\s*(-?\d{1,3}(?:\.\d+)?)[\s,]+(?:and\s+)?lon(?:gitude)?\s*[:=]?\s*(-?\d{1,3}(?:\.\d+)?)",
        )
        .expect("valid regex")
    })
}

fn coordinate_pair() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(-?\d{1,3}\.\d+)\s*,\s*(-?\d{1,3}\.\d+)").expect("valid regex")
    })
}

fn location_clause() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:for|in|at)\s+(.+)$").expect("valid regex"))
}

fn separators() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\s*(?:,|;|&|/|\band\b|\bor\b)\s*").expect("valid regex"))
}

/// Deterministic reasoner for weather queries
///
/// Finds the requested actions by keyword and the locations from the phrase
/// following "for"/"in"/"at", falling back to a scan for state names. Unknown
/// place names are kept so the worker can report them as failures.
#[derive(Debug, Default, Clone)]
pub struct KeywordReasoner;

impl KeywordReasoner {
    pub fn new() -> Self {
        Self
    }

    /// Actions mentioned in the text, in order of first mention
    fn actions(text: &str) -> Vec<WeatherAction> {
        let lower = text.to_lowercase();
        let mut found: Vec<(usize, WeatherAction)> = Vec::new();
        for (keyword, action) in [
            ("alert", WeatherAction::Alerts),
            ("warning", WeatherAction::Alerts),
            ("advisor", WeatherAction::Alerts),
            ("forecast", WeatherAction::Forecast),
        ] {
            if let Some(pos) = lower.find(keyword) {
                if !found.iter().any(|(_, a)| *a == action) {
                    found.push((pos, action));
                } else if let Some(entry) = found.iter_mut().find(|(_, a)| *a == action) {
                    entry.0 = entry.0.min(pos);
                }
            }
        }
        found.sort_by_key(|(pos, _)| *pos);
        found.into_iter().map(|(_, action)| action).collect()
    }

    /// Location strings in order of mention
    fn locations(text: &str) -> Vec<String> {
        let mut positioned: Vec<(usize, String)> = Vec::new();
        let mut remainder = text.to_string();

        for re in [explicit_coordinates(), coordinate_pair()] {
            let mut spans = Vec::new();
            for caps in re.captures_iter(&remainder) {
                let (Some(whole), Some(lat), Some(lon)) = (caps.get(0), caps.get(1), caps.get(2))
                else {
                    continue;
                };
                let (Ok(lat), Ok(lon)) = (lat.as_str().parse::<f64>(), lon.as_str().parse::<f64>())
                else {
                    continue;
                };
                if let Some(point) = Coordinates::new(lat, lon) {
                    positioned.push((whole.start(), format!("{},{}", point.latitude, point.longitude)));
                    spans.push(whole.range());
                }
            }
            for range in spans.into_iter().rev() {
                remainder.replace_range(range.clone(), &" ".repeat(range.len()));
            }
        }

        if let Some(clause) = location_clause().captures(&remainder).and_then(|caps| caps.get(1)) {
            let text = clause.as_str();
            let mut start = 0;
            let mut after_comma = false;
            let mut pieces = Vec::new();
            for sep in separators().find_iter(text) {
                pieces.push((clause.start() + start, &text[start..sep.start()], after_comma));
                after_comma = sep.as_str().trim() == ",";
                start = sep.end();
            }
            pieces.push((clause.start() + start, &text[start..], after_comma));

            let mut previous_is_place = false;
            for (offset, piece, after_comma) in pieces {
                let cleaned = clean_piece(piece);
                if cleaned.is_empty() {
                    previous_is_place = false;
                    continue;
                }
                // "Bloomington, Indiana" names one place, not two
                if after_comma && previous_is_place && lookup_state(&cleaned).is_some() {
                    if let Some((_, place)) = positioned.last_mut() {
                        place.push_str(", ");
                        place.push_str(&cleaned);
                    }
                    previous_is_place = false;
                    continue;
                }
                previous_is_place = lookup_state(&cleaned).is_none();
                positioned.push((offset, cleaned));
            }
        } else {
            let lower = remainder.to_lowercase();
            for state in US_STATES.iter() {
                if let Some(pos) = find_word(&lower, &state.name.to_lowercase()) {
                    positioned.push((pos, state.name.to_string()));
                }
            }
        }

        positioned.sort_by_key(|(pos, _)| *pos);
        let mut seen: Vec<String> = Vec::new();
        positioned
            .into_iter()
            .filter_map(|(_, location)| {
                let key = location.to_lowercase();
                if seen.contains(&key) {
                    None
                } else {
                    seen.push(key);
                    Some(location)
                }
            })
            .collect()
    }
}

/// Strips punctuation and filler words from one location phrase
fn clean_piece(piece: &str) -> String {
    piece
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric() && c != '-' && c != '.'))
        .map(|word| word.trim_end_matches('.'))
        .filter(|word| !word.is_empty() && !FILLER.contains(&word.to_lowercase().as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Byte offset of `needle` in `haystack` as a whole word
fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    haystack.match_indices(needle).map(|(pos, _)| pos).find(|&pos| {
        let before = haystack[..pos].chars().next_back();
        let after = haystack[pos + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

#[async_trait]
impl Reasoner for KeywordReasoner {
    async fn decompose(&self, query: &str) -> Result<Vec<SubtaskSpec>, ReasoningError> {
        let lower = query.to_lowercase();
        let mut actions = Self::actions(query);
        if actions.is_empty() {
            if !lower.contains("weather") {
                return Ok(Vec::new());
            }
            actions.push(WeatherAction::Forecast);
        }

        let locations = Self::locations(query);
        let mut subtasks = Vec::with_capacity(locations.len() * actions.len());
        for location in &locations {
            let is_point = Coordinates::parse(location).is_some();
            for action in &actions {
                // alerts are served per state; a bare point only gets a forecast
                if is_point && *action == WeatherAction::Alerts && actions.len() > 1 {
                    continue;
                }
                let action = if is_point { WeatherAction::Forecast } else { *action };
                subtasks.push(SubtaskSpec::new(action, location.clone()));
            }
        }
        Ok(subtasks)
    }

    async fn interpret(&self, text: &str) -> Result<Intent, ReasoningError> {
        let targets = Self::locations(text);
        if targets.is_empty() {
            return Err(ReasoningError::NotActionable(format!(
                "no location found in '{}'",
                text
            )));
        }

        let action = match Self::actions(text).first() {
            Some(action) => *action,
            None if text.to_lowercase().contains("weather") => WeatherAction::Forecast,
            None => {
                return Err(ReasoningError::NotActionable(format!(
                    "no weather lookup requested in '{}'",
                    text
                )))
            }
        };
        let action = if targets.iter().all(|t| Coordinates::parse(t).is_some()) {
            WeatherAction::Forecast
        } else {
            action
        };

        Ok(Intent { action, targets })
    }
}
