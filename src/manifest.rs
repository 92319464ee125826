//! Manifest inspection
//!
//! Extracts audio renditions from HLS master playlists and DASH MPDs, and
//! holds the small text heuristics used on Stremio add-on listings.

use crate::error::ProviderError;
use crate::models::{AudioTrack, TrackId};

/// Markers that flag a Portuguese (or Latin-dubbed) release in add-on listings
pub const DUB_MARKERS: &[&str] = &["PT-BR", "Dublado", "Português", "Latino"];

// =============================================================================
// HLS
// =============================================================================

/// Parse `#EXT-X-MEDIA:TYPE=AUDIO` entries from an HLS master playlist.
///
/// Track id is the rendition's GROUP-ID. A playlist without the `#EXTM3U`
/// header is rejected as malformed.
pub fn parse_hls_audio_tracks(manifest: &str) -> Result<Vec<AudioTrack>, ProviderError> {
    let mut lines = manifest.lines().map(str::trim).filter(|l| !l.is_empty());
    if lines.next() != Some("#EXTM3U") {
        return Err(ProviderError::Manifest(
            "HLS playlist does not start with #EXTM3U".to_string(),
        ));
    }

    let tracks = lines
        .filter_map(|line| line.strip_prefix("#EXT-X-MEDIA:"))
        .map(parse_attribute_list)
        .filter(|attrs| attr(attrs, "TYPE") == Some("AUDIO"))
        .filter_map(|attrs| {
            let group = attr(&attrs, "GROUP-ID")?;
            let lang = attr(&attrs, "LANGUAGE")
                .filter(|l| !l.is_empty())
                .unwrap_or("und");
            let name = attr(&attrs, "NAME").filter(|n| !n.is_empty()).unwrap_or(lang);
            Some(AudioTrack {
                id: TrackId::Name(group.to_string()),
                lang: lang.to_string(),
                name: name.to_string(),
                is_default: attr(&attrs, "DEFAULT") == Some("YES"),
            })
        })
        .collect();

    Ok(tracks)
}

/// Split an HLS attribute list, honoring quoted values that contain commas
fn parse_attribute_list(list: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut rest = list;

    while !rest.is_empty() {
        let Some(eq) = rest.find('=') else { break };
        let key = rest[..eq].trim().to_string();
        let after = &rest[eq + 1..];

        let (value, remainder) = if let Some(quoted) = after.strip_prefix('"') {
            match quoted.find('"') {
                Some(end) => (&quoted[..end], &quoted[end + 1..]),
                None => (quoted, ""),
            }
        } else {
            match after.find(',') {
                Some(end) => (&after[..end], &after[end..]),
                None => (after, ""),
            }
        };

        attrs.push((key, value.trim().to_string()));
        rest = remainder.trim_start_matches(',');
    }

    attrs
}

fn attr<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

// =============================================================================
// DASH
// =============================================================================

/// Parse audio adaptation sets from a DASH MPD.
///
/// An adaptation set is audio if its `mimeType` or `contentType` says so,
/// or if its representations carry an audio mime type.
pub fn parse_dash_audio_tracks(manifest: &str) -> Result<Vec<AudioTrack>, ProviderError> {
    let doc = roxmltree::Document::parse(manifest)
        .map_err(|e| ProviderError::Manifest(format!("DASH manifest is not XML: {}", e)))?;

    if doc.root_element().tag_name().name() != "MPD" {
        return Err(ProviderError::Manifest(
            "DASH manifest root is not <MPD>".to_string(),
        ));
    }

    let tracks = doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "AdaptationSet")
        .filter(|set| is_audio_set(set))
        .map(|set| {
            let lang = set
                .attribute("lang")
                .filter(|l| !l.is_empty())
                .unwrap_or("und");
            let id = set.attribute("id").unwrap_or(lang);
            let name = child(&set, "Label")
                .and_then(|label| label.text())
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(lang);
            let is_default = set.attribute("role") == Some("main")
                || child(&set, "Role").and_then(|r| r.attribute("value")) == Some("main");

            AudioTrack {
                id: TrackId::Name(id.to_string()),
                lang: lang.to_string(),
                name: name.to_string(),
                is_default,
            }
        })
        .collect();

    Ok(tracks)
}

fn is_audio_set(set: &roxmltree::Node<'_, '_>) -> bool {
    let is_audio = |v: Option<&str>| v.is_some_and(|v| v == "audio" || v.starts_with("audio/"));

    is_audio(set.attribute("mimeType"))
        || is_audio(set.attribute("contentType"))
        || set
            .children()
            .filter(|c| c.tag_name().name() == "Representation")
            .any(|r| is_audio(r.attribute("mimeType")))
}

fn child<'a, 'input>(
    node: &roxmltree::Node<'a, 'input>,
    name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    node.children().find(|c| c.tag_name().name() == name)
}

// =============================================================================
// Add-on Listing Heuristics
// =============================================================================

/// True if the text mentions one of the dub markers (case-insensitive)
pub fn mentions_dub_marker(text: &str) -> bool {
    let text = text.to_lowercase();
    DUB_MARKERS
        .iter()
        .any(|marker| text.contains(&marker.to_lowercase()))
}

/// Extract vertical resolution from a description ("… 1080p …" → 1080).
///
/// Returns 0 when no `<digits>p` token is present.
pub fn extract_quality(description: &str) -> u32 {
    let re = regex::Regex::new(r"(\d+)p").ok();
    re.and_then(|re| re.captures(description))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}
