//! Audio track selection
//!
//! The hand-off between a resolved [`Stream`] and whatever plays it: the
//! player exposes the stream's tracks, lets the user pick one by id, and
//! publishes every change on a watch channel.

use thiserror::Error;
use tokio::sync::watch;

use crate::models::{is_portuguese, AudioTrack, Stream, TrackId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    #[error("no audio track with id {0}")]
    UnknownTrack(TrackId),
}

/// Friendly name for common language codes
pub fn language_name(lang: &str) -> &str {
    match lang {
        "pt" | "por" => "Portuguese",
        "pt-BR" => "Portuguese (Brazil)",
        "en" => "English",
        "en-US" => "English (US)",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "it" => "Italian",
        "ja" => "Japanese",
        "und" | "" => "Undetermined",
        other => other,
    }
}

/// Track list of one stream plus the current selection
#[derive(Debug)]
pub struct AudioTrackSelector {
    tracks: Vec<AudioTrack>,
    current: watch::Sender<Option<AudioTrack>>,
}

impl AudioTrackSelector {
    /// Start with the manifest's default track selected, if any
    pub fn new(tracks: Vec<AudioTrack>) -> Self {
        let initial = tracks.iter().find(|t| t.is_default).cloned();
        let (current, _) = watch::channel(initial);
        Self { tracks, current }
    }

    /// Build from a stream, then switch to Portuguese audio when present.
    ///
    /// Embeds report no tracks; a dubbed embed gets a single synthetic
    /// Portuguese track so consumers can still show what they are playing.
    pub fn from_stream(stream: &Stream) -> Self {
        let tracks = if stream.audio_tracks.is_empty() && stream.is_dubbed {
            vec![AudioTrack {
                id: TrackId::Index(0),
                lang: "pt-BR".to_string(),
                name: language_name("pt-BR").to_string(),
                is_default: true,
            }]
        } else {
            stream
                .audio_tracks
                .iter()
                .cloned()
                .map(|mut t| {
                    if t.name.is_empty() {
                        t.name = language_name(&t.lang).to_string();
                    }
                    t
                })
                .collect()
        };

        let selector = Self::new(tracks);
        selector.select_portuguese();
        selector
    }

    pub fn tracks(&self) -> &[AudioTrack] {
        &self.tracks
    }

    pub fn current(&self) -> Option<AudioTrack> {
        self.current.borrow().clone()
    }

    pub fn has_portuguese(&self) -> bool {
        self.tracks.iter().any(|t| is_portuguese(&t.lang))
    }

    /// Switch to the track with `id` and notify subscribers.
    ///
    /// Ids are not guaranteed unique (HLS renditions share a group id);
    /// the first match wins.
    pub fn select_track(&self, id: &TrackId) -> Result<AudioTrack, AudioError> {
        let track = self
            .tracks
            .iter()
            .find(|t| &t.id == id)
            .cloned()
            .ok_or_else(|| AudioError::UnknownTrack(id.clone()))?;

        tracing::debug!(track = %track, "audio track selected");
        self.current.send_replace(Some(track.clone()));
        Ok(track)
    }

    /// Select the first Portuguese track; returns it if one exists
    pub fn select_portuguese(&self) -> Option<AudioTrack> {
        let track = self.tracks.iter().find(|t| t.is_portuguese())?.clone();
        self.current.send_replace(Some(track.clone()));
        Some(track)
    }

    /// Receive every selection change
    pub fn subscribe(&self) -> watch::Receiver<Option<AudioTrack>> {
        self.current.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StreamFormat;

    fn track(id: &str, lang: &str, is_default: bool) -> AudioTrack {
        AudioTrack {
            id: TrackId::Name(id.into()),
            lang: lang.into(),
            name: String::new(),
            is_default,
        }
    }

    fn stream(tracks: Vec<AudioTrack>, is_dubbed: bool) -> Stream {
        Stream {
            url: "https://cdn/x.m3u8".into(),
            format: StreamFormat::Hls,
            audio_tracks: tracks,
            subtitles: vec![],
            is_dubbed,
            source_name: "Test".into(),
        }
    }

    #[test]
    fn test_auto_selects_portuguese() {
        let selector = AudioTrackSelector::from_stream(&stream(
            vec![track("en", "en", true), track("pt", "pt-BR", false)],
            true,
        ));
        let current = selector.current().unwrap();
        assert_eq!(current.lang, "pt-BR");
        assert_eq!(current.name, "Portuguese (Brazil)");
    }

    #[test]
    fn test_keeps_default_without_portuguese() {
        let selector = AudioTrackSelector::from_stream(&stream(
            vec![track("en", "en", true), track("es", "es", false)],
            false,
        ));
        assert_eq!(selector.current().unwrap().lang, "en");
        assert!(!selector.has_portuguese());
    }

    #[test]
    fn test_dubbed_embed_gets_synthetic_track() {
        let mut embed = Stream::embed("https://e/tt1", "Embed");
        embed.is_dubbed = true;
        let selector = AudioTrackSelector::from_stream(&embed);
        assert_eq!(selector.tracks().len(), 1);
        assert!(selector.has_portuguese());

        let plain = AudioTrackSelector::from_stream(&Stream::embed("https://e/tt1", "Embed"));
        assert!(plain.tracks().is_empty());
        assert!(plain.current().is_none());
    }

    #[tokio::test]
    async fn test_select_track_notifies() {
        let selector = AudioTrackSelector::new(vec![track("a", "en", true), track("b", "pt", false)]);
        let mut rx = selector.subscribe();

        let picked = selector.select_track(&TrackId::from("b")).unwrap();
        assert_eq!(picked.lang, "pt");

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().map(|t| t.lang.as_str()), Some("pt"));
    }

    #[test]
    fn test_select_unknown_track() {
        let selector = AudioTrackSelector::new(vec![track("a", "en", true)]);
        let err = selector.select_track(&TrackId::Index(7)).unwrap_err();
        assert_eq!(err, AudioError::UnknownTrack(TrackId::Index(7)));
        assert_eq!(selector.current().unwrap().lang, "en");
    }

    #[test]
    fn test_language_name() {
        assert_eq!(language_name("pt-BR"), "Portuguese (Brazil)");
        assert_eq!(language_name("und"), "Undetermined");
        assert_eq!(language_name("sv"), "sv");
    }
}
