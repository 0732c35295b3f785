use super::types::TileCoord;
use crate::{MapError, Result};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Key(String),
}

/// Tile URL template such as `https://{s}.tile.example.org/{z}/{x}/{y}.png`.
///
/// `{s}`, `{z}`, `{x}` and `{y}` are filled per tile; any other `{name}` must
/// be provided as an extra option. Placeholders are checked once, when the
/// template is built, so producing a URL cannot fail afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    raw: String,
    segments: Vec<Segment>,
    uses_subdomain: bool,
}

const TILE_KEYS: [&str; 4] = ["s", "x", "y", "z"];

impl UrlTemplate {
    pub fn parse(raw: &str, extra: &BTreeMap<String, String>, subdomains: &[String]) -> Result<Self> {
        let segments = split_segments(raw);

        for segment in &segments {
            if let Segment::Key(key) = segment {
                if !TILE_KEYS.contains(&key.as_str()) && !extra.contains_key(key) {
                    return Err(MapError::Template(key.clone()));
                }
            }
        }

        let uses_subdomain = segments
            .iter()
            .any(|segment| matches!(segment, Segment::Key(key) if key == "s"));
        if uses_subdomain && subdomains.is_empty() {
            return Err(MapError::InvalidOptions(
                "template uses {s} but no subdomains are configured".into(),
            ));
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
            uses_subdomain,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn uses_subdomain(&self) -> bool {
        self.uses_subdomain
    }

    /// Builds the URL for a tile. The subdomain is picked round-robin by
    /// `(x + y) mod n`.
    pub fn render(
        &self,
        coord: &TileCoord,
        subdomains: &[String],
        extra: &BTreeMap<String, String>,
    ) -> String {
        let mut url = String::with_capacity(self.raw.len() + 16);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => url.push_str(text),
                Segment::Key(key) => match key.as_str() {
                    "x" => url.push_str(&coord.x.to_string()),
                    "y" => url.push_str(&coord.y.to_string()),
                    "z" => url.push_str(&coord.z.to_string()),
                    "s" => {
                        if !subdomains.is_empty() {
                            let index = (coord.x + coord.y).rem_euclid(subdomains.len() as i64);
                            url.push_str(&subdomains[index as usize]);
                        }
                    }
                    other => {
                        if let Some(value) = extra.get(other) {
                            url.push_str(value);
                        }
                    }
                },
            }
        }
        url
    }
}

/// Splits on `{ name }` placeholders; names are word characters, optionally
/// padded with spaces. Anything else in braces stays literal.
fn split_segments(raw: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = raw;

    while let Some(open) = rest.find('{') {
        literal.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let key = after.find('}').and_then(|close| {
            let name = after[..close].trim_matches(' ');
            let valid = !name.is_empty()
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            valid.then(|| (name.to_string(), close))
        });

        match key {
            Some((name, close)) => {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Key(name));
                rest = &after[close + 1..];
            }
            None => {
                literal.push('{');
                rest = after;
            }
        }
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> Vec<String> {
        vec!["a".into(), "b".into(), "c".into()]
    }

    #[test]
    fn test_render_osm_template() {
        let extra = BTreeMap::new();
        let template =
            UrlTemplate::parse("https://{s}.tile.osm.org/{z}/{x}/{y}.png", &extra, &abc()).unwrap();

        let url = template.render(&TileCoord { x: 3, y: 5, z: 4 }, &abc(), &extra);
        // (3 + 5) mod 3 = 2
        assert_eq!(url, "https://c.tile.osm.org/4/3/5.png");
        assert!(template.uses_subdomain());
    }

    #[test]
    fn test_extra_options_and_padding() {
        let mut extra = BTreeMap::new();
        extra.insert("apiKey".to_string(), "k123".to_string());
        let template =
            UrlTemplate::parse("/tiles/{ z }/{x}/{y}?key={apiKey}", &extra, &[]).unwrap();

        let url = template.render(&TileCoord { x: 0, y: 1, z: 2 }, &[], &extra);
        assert_eq!(url, "/tiles/2/0/1?key=k123");
    }

    #[test]
    fn test_missing_key_is_an_error() {
        let err = UrlTemplate::parse("/{z}/{x}/{y}.png?{token}", &BTreeMap::new(), &abc())
            .unwrap_err();
        assert!(matches!(err, MapError::Template(key) if key == "token"));
    }

    #[test]
    fn test_subdomain_without_list_is_an_error() {
        assert!(UrlTemplate::parse("{s}/{z}", &BTreeMap::new(), &[]).is_err());
    }

    #[test]
    fn test_non_placeholder_braces_stay_literal() {
        let extra = BTreeMap::new();
        let template = UrlTemplate::parse("/{z}/{a-b}/{}", &extra, &abc()).unwrap();
        let url = template.render(&TileCoord { x: 0, y: 0, z: 7 }, &abc(), &extra);
        assert_eq!(url, "/7/{a-b}/{}");
    }

    #[test]
    fn test_negative_coordinates_pick_subdomain() {
        let extra = BTreeMap::new();
        let template = UrlTemplate::parse("{s}", &extra, &abc()).unwrap();
        let url = template.render(&TileCoord { x: -2, y: 0, z: 0 }, &abc(), &extra);
        assert_eq!(url, "b");
    }
}
