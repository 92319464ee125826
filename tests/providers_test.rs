//! Provider tests against mocked HTTP endpoints
//!
//! Covers the dubbed HLS/DASH/API chain, the add-on catalogs and the
//! embed reachability probe.

use mockito::Server;

use streamdub::error::ProviderError;
use streamdub::models::{
    ContentType, StreamFormat, StreamOptions, StreamRequest, TitleId, TrackId,
};
use streamdub::providers::{
    AddonCatalogs, DubAddonResolver, DubbedStreamProvider, EmbedSources, EndpointTemplates,
    StreamProvider, SubtitledEmbedProvider,
};

/// Nothing listens on port 1; connections are refused immediately
const UNREACHABLE: &str = "http://127.0.0.1:1/";

const PT_BR_MASTER: &str = r#"#EXTM3U
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="aud-pt",LANGUAGE="pt-BR",NAME="Português",DEFAULT=YES,AUTOSELECT=YES,URI="pt/index.m3u8"
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="aud-en",LANGUAGE="en",NAME="English",DEFAULT=NO,URI="en/index.m3u8"
#EXT-X-STREAM-INF:BANDWIDTH=5000000,RESOLUTION=1920x1080,AUDIO="aud-pt"
video/1080p.m3u8
"#;

const EN_ONLY_MASTER: &str = r#"#EXTM3U
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="aud",LANGUAGE="en",NAME="English",DEFAULT=YES
#EXT-X-STREAM-INF:BANDWIDTH=5000000,AUDIO="aud"
video.m3u8
"#;

const POR_MPD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" type="static">
  <Period>
    <AdaptationSet id="1" contentType="video" mimeType="video/mp4">
      <Representation id="v1" bandwidth="4000000"/>
    </AdaptationSet>
    <AdaptationSet id="2" mimeType="audio/mp4" lang="por">
      <Role schemeIdUri="urn:mpeg:dash:role:2011" value="main"/>
      <Label>Português</Label>
      <Representation id="a1" bandwidth="128000"/>
    </AdaptationSet>
  </Period>
</MPD>
"#;

fn matrix() -> StreamRequest {
    StreamRequest::movie(TitleId::imdb("tt0133093"))
}

fn options() -> StreamOptions {
    StreamOptions::default().with_timeout_ms(2_000)
}

// =============================================================================
// DubbedStreamProvider
// =============================================================================

#[tokio::test]
async fn test_dubbed_disabled_until_configured() {
    let provider = DubbedStreamProvider::new();

    assert!(!provider.is_enabled());
    assert!(!provider.supports(&matrix()));
    assert_eq!(provider.get_stream(&matrix(), &options()).await.unwrap(), None);

    let health = provider.check_health().await;
    assert!(!health.is_online);
}

#[tokio::test]
async fn test_dubbed_missing_identifier_is_an_error_even_when_disabled() {
    let provider = DubbedStreamProvider::new();
    let request = StreamRequest::movie(TitleId::default());

    let err = provider.get_stream(&request, &options()).await.unwrap_err();
    assert!(matches!(err, ProviderError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_dubbed_hls_manifest() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/hls/tt0133093/master.m3u8")
        .with_status(200)
        .with_header("content-type", "application/vnd.apple.mpegurl")
        .with_body(PT_BR_MASTER)
        .create_async()
        .await;

    let provider = DubbedStreamProvider::with_endpoints(EndpointTemplates {
        hls: Some(format!("{}/hls/{{imdbId}}/master.m3u8", server.url())),
        ..EndpointTemplates::default()
    });

    let stream = provider
        .get_stream(&matrix(), &options())
        .await
        .unwrap()
        .unwrap();

    mock.assert_async().await;

    assert_eq!(stream.format, StreamFormat::Hls);
    assert_eq!(stream.url, format!("{}/hls/tt0133093/master.m3u8", server.url()));
    assert!(stream.is_dubbed);
    assert_eq!(stream.source_name, "DubladoProvider");
    assert_eq!(stream.audio_tracks.len(), 2);
    assert_eq!(stream.audio_tracks[0].id, TrackId::from("aud-pt"));
    assert!(stream.audio_tracks[0].is_default);
}

#[tokio::test]
async fn test_dubbed_hls_without_portuguese_is_not_dubbed() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/hls/tt0133093.m3u8")
        .with_status(200)
        .with_body(EN_ONLY_MASTER)
        .create_async()
        .await;

    let provider = DubbedStreamProvider::with_endpoints(EndpointTemplates {
        hls: Some(format!("{}/hls/{{id}}.m3u8", server.url())),
        ..EndpointTemplates::default()
    });

    let stream = provider
        .get_stream(&matrix(), &options())
        .await
        .unwrap()
        .unwrap();
    assert!(!stream.is_dubbed);
    assert!(!stream.has_portuguese_audio());
}

#[tokio::test]
async fn test_dubbed_falls_back_from_hls_to_dash() {
    let mut server = Server::new_async().await;
    let hls = server
        .mock("GET", "/hls/tt0133093.m3u8")
        .with_status(404)
        .create_async()
        .await;
    let dash = server
        .mock("GET", "/dash/tt0133093.mpd")
        .with_status(200)
        .with_header("content-type", "application/dash+xml")
        .with_body(POR_MPD)
        .create_async()
        .await;

    let provider = DubbedStreamProvider::with_endpoints(EndpointTemplates {
        hls: Some(format!("{}/hls/{{id}}.m3u8", server.url())),
        dash: Some(format!("{}/dash/{{id}}.mpd", server.url())),
        api: None,
    });

    let stream = provider
        .get_stream(&matrix(), &options())
        .await
        .unwrap()
        .unwrap();

    hls.assert_async().await;
    dash.assert_async().await;

    assert_eq!(stream.format, StreamFormat::Dash);
    assert!(stream.is_dubbed);
    assert_eq!(stream.audio_tracks.len(), 1);
    assert_eq!(stream.audio_tracks[0].lang, "por");
    assert_eq!(stream.audio_tracks[0].name, "Português");
    assert!(stream.audio_tracks[0].is_default);
}

#[tokio::test]
async fn test_dubbed_malformed_manifest_falls_back_to_api() {
    let mut server = Server::new_async().await;
    let _hls = server
        .mock("GET", "/hls/tt0133093.m3u8")
        .with_status(200)
        .with_body("<html>not a playlist</html>")
        .create_async()
        .await;
    let api = server
        .mock("GET", "/api/movie/tt0133093")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "url": "https://cdn.example/matrix/master.m3u8",
                "audioTracks": [{"id": 0, "lang": "pt-BR", "name": "Português", "isDefault": true}],
                "subtitles": [{"lang": "pt", "url": "https://cdn.example/pt.vtt"}]
            }"#,
        )
        .create_async()
        .await;

    let provider = DubbedStreamProvider::with_endpoints(EndpointTemplates {
        hls: Some(format!("{}/hls/{{id}}.m3u8", server.url())),
        dash: None,
        api: Some(format!("{}/api/{{type}}/{{id}}", server.url())),
    });

    let stream = provider
        .get_stream(&matrix(), &options())
        .await
        .unwrap()
        .unwrap();

    api.assert_async().await;
    assert_eq!(stream.url, "https://cdn.example/matrix/master.m3u8");
    assert_eq!(stream.format, StreamFormat::Hls);
    assert!(stream.is_dubbed);
    assert_eq!(stream.audio_tracks[0].id, TrackId::Index(0));
    assert_eq!(stream.subtitles.len(), 1);
}

#[tokio::test]
async fn test_dubbed_api_respects_explicit_not_dubbed() {
    let mut server = Server::new_async().await;
    let _api = server
        .mock("GET", "/api/tt0133093")
        .with_status(200)
        .with_body(r#"{"url": "https://cdn.example/movie.mp4", "format": "mp4", "isDubbed": false}"#)
        .create_async()
        .await;

    let provider = DubbedStreamProvider::with_endpoints(EndpointTemplates {
        api: Some(format!("{}/api/{{id}}", server.url())),
        ..EndpointTemplates::default()
    });

    let stream = provider
        .get_stream(&matrix(), &options())
        .await
        .unwrap()
        .unwrap();
    assert!(!stream.is_dubbed);
    assert_eq!(stream.format, StreamFormat::Mp4);
}

#[tokio::test]
async fn test_dubbed_api_without_url_yields_none() {
    let mut server = Server::new_async().await;
    let api = server
        .mock("GET", "/api/tt0133093")
        .with_status(200)
        .with_body(r#"{"isDubbed": true}"#)
        .create_async()
        .await;

    let provider = DubbedStreamProvider::with_endpoints(EndpointTemplates {
        api: Some(format!("{}/api/{{id}}", server.url())),
        ..EndpointTemplates::default()
    });

    // the missing field fails the API attempt, which exhausts the chain
    let result = provider.get_stream(&matrix(), &options()).await.unwrap();
    api.assert_async().await;
    assert!(result.is_none());
}

#[tokio::test]
async fn test_dubbed_series_template_expansion() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/tv/tt0903747/s1/e2/master.m3u8")
        .with_status(200)
        .with_body(PT_BR_MASTER)
        .create_async()
        .await;

    let provider = DubbedStreamProvider::with_endpoints(EndpointTemplates {
        hls: Some(format!(
            "{}/tv/{{imdbId}}/s{{season}}/e{{episode}}/master.m3u8",
            server.url()
        )),
        ..EndpointTemplates::default()
    });

    let request = StreamRequest::episode(TitleId::imdb("tt0903747"), 1, 2);
    let stream = provider.get_stream(&request, &options()).await.unwrap();

    mock.assert_async().await;
    assert!(stream.is_some_and(|s| s.is_dubbed));
}

#[tokio::test]
async fn test_dubbed_configure_merges_templates() {
    let provider = DubbedStreamProvider::with_endpoints(EndpointTemplates {
        hls: Some("https://a/{id}.m3u8".into()),
        ..EndpointTemplates::default()
    });

    assert!(provider.configure(&EndpointTemplates {
        api: Some("https://b/{id}".into()),
        ..EndpointTemplates::default()
    }));

    let endpoints = provider.endpoints();
    assert_eq!(endpoints.hls.as_deref(), Some("https://a/{id}.m3u8"));
    assert_eq!(endpoints.api.as_deref(), Some("https://b/{id}"));
    assert!(provider.supports(&matrix()));
}

// =============================================================================
// DubAddonResolver
// =============================================================================

fn catalogs(server: &Server) -> AddonCatalogs {
    AddonCatalogs {
        primary: format!("{}/br", server.url()),
        fallback: format!("{}/torrents", server.url()),
    }
}

#[tokio::test]
async fn test_addon_primary_first_dubbed_listing() {
    let mut server = Server::new_async().await;
    let primary = server
        .mock("GET", "/br/stream/movie/tt0133093.json")
        .with_status(200)
        .with_body(
            r#"{"streams": [
                {"name": "BR", "title": "Matrix 1080p Legendado", "url": "https://x/leg.mp4"},
                {"name": "BR", "title": "Matrix 720p Dublado", "url": "https://x/dub.m3u8"},
                {"name": "BR", "title": "Matrix 1080p PT-BR", "url": "https://x/dub1080.mp4"}
            ]}"#,
        )
        .create_async()
        .await;
    let fallback = server
        .mock("GET", "/torrents/stream/movie/tt0133093.json")
        .expect(0)
        .create_async()
        .await;

    let resolver = DubAddonResolver::with_catalogs(catalogs(&server));
    let stream = resolver
        .get_stream(&matrix(), &options())
        .await
        .unwrap()
        .unwrap();

    primary.assert_async().await;
    fallback.assert_async().await;

    assert_eq!(stream.url, "https://x/dub.m3u8");
    assert_eq!(stream.format, StreamFormat::Hls);
    assert!(stream.is_dubbed);
    assert_eq!(stream.source_name, "StremioDubAddon");
}

#[tokio::test]
async fn test_addon_fallback_best_quality() {
    let mut server = Server::new_async().await;
    let _primary = server
        .mock("GET", "/br/stream/movie/tt0133093.json")
        .with_status(200)
        .with_body(r#"{"streams": [{"title": "Matrix English", "url": "https://x/en.mp4"}]}"#)
        .create_async()
        .await;
    let _fallback = server
        .mock("GET", "/torrents/stream/movie/tt0133093.json")
        .with_status(200)
        .with_body(
            r#"{"streams": [
                {"name": "Torrentio", "title": "Matrix Dual Audio Latino", "description": "720p WEB", "url": "https://x/720.mkv"},
                {"name": "Torrentio", "title": "Matrix Dublado", "description": "BluRay 1080p", "url": "https://x/1080.mkv"},
                {"name": "Torrentio", "title": "Matrix", "description": "2160p", "url": "https://x/2160.mkv"}
            ]}"#,
        )
        .create_async()
        .await;

    let resolver = DubAddonResolver::with_catalogs(catalogs(&server));
    let stream = resolver
        .get_stream(&matrix(), &options())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(stream.url, "https://x/1080.mkv");
    assert_eq!(stream.format, StreamFormat::Mp4);
}

#[tokio::test]
async fn test_addon_primary_error_uses_fallback() {
    let mut server = Server::new_async().await;
    let _primary = server
        .mock("GET", "/br/stream/movie/tt0133093.json")
        .with_status(500)
        .create_async()
        .await;
    let _fallback = server
        .mock("GET", "/torrents/stream/movie/tt0133093.json")
        .with_status(200)
        .with_body(r#"{"streams": [{"title": "Matrix PT-BR", "description": "1080p", "url": "https://x/pt.mp4"}]}"#)
        .create_async()
        .await;

    let resolver = DubAddonResolver::with_catalogs(catalogs(&server));
    let stream = resolver.get_stream(&matrix(), &options()).await.unwrap();
    assert_eq!(stream.map(|s| s.url), Some("https://x/pt.mp4".to_string()));
}

#[tokio::test]
async fn test_addon_nothing_qualifying_yields_none() {
    let mut server = Server::new_async().await;
    let _primary = server
        .mock("GET", "/br/stream/movie/tt0133093.json")
        .with_status(503)
        .create_async()
        .await;
    let _fallback = server
        .mock("GET", "/torrents/stream/movie/tt0133093.json")
        .with_status(200)
        .with_body(r#"{"streams": []}"#)
        .create_async()
        .await;

    let resolver = DubAddonResolver::with_catalogs(catalogs(&server));
    assert!(resolver
        .get_stream(&matrix(), &options())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_addon_series_stremio_id() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/br/stream/series/tt0903747:1:2.json")
        .with_status(200)
        .with_body(r#"{"streams": [{"title": "S01E02 Dublado", "url": "https://x/s1e2.mp4"}]}"#)
        .create_async()
        .await;

    let resolver = DubAddonResolver::with_catalogs(catalogs(&server));
    let request = StreamRequest::episode(TitleId::imdb("tt0903747"), 1, 2);
    let stream = resolver.get_stream(&request, &options()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(stream.map(|s| s.url), Some("https://x/s1e2.mp4".to_string()));
}

#[tokio::test]
async fn test_addon_health_probes_manifest() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/br/manifest.json")
        .with_status(200)
        .with_body(r#"{"id": "br.addon", "name": "BR"}"#)
        .create_async()
        .await;

    let resolver = DubAddonResolver::with_catalogs(catalogs(&server));
    let health = resolver.check_health().await;

    mock.assert_async().await;
    assert!(health.is_online);
    assert_eq!(health.name, "StremioDubAddon");
}

// =============================================================================
// SubtitledEmbedProvider
// =============================================================================

#[tokio::test]
async fn test_embed_first_reachable_source() {
    let mut server = Server::new_async().await;
    // any status counts as reachable
    let mock = server
        .mock("HEAD", "/embed/movie/tt0133093")
        .with_status(403)
        .create_async()
        .await;

    let provider = SubtitledEmbedProvider::with_sources(EmbedSources {
        movie: vec![
            UNREACHABLE.to_string(),
            format!("{}/embed/movie/", server.url()),
        ],
        series: vec![],
        imdb_fallback: None,
    });

    let stream = provider
        .get_stream(&matrix(), &options())
        .await
        .unwrap()
        .unwrap();

    mock.assert_async().await;
    assert_eq!(stream.url, format!("{}/embed/movie/tt0133093", server.url()));
    assert_eq!(stream.format, StreamFormat::Embed);
    assert!(!stream.is_dubbed);
    assert_eq!(stream.source_name, "LegendadoEmbed");
}

#[tokio::test]
async fn test_embed_imdb_fallback_host() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("HEAD", "/fallback/tt0133093")
        .with_status(200)
        .create_async()
        .await;

    let provider = SubtitledEmbedProvider::with_sources(EmbedSources {
        movie: vec![UNREACHABLE.to_string()],
        series: vec![],
        imdb_fallback: Some(format!("{}/fallback/", server.url())),
    });

    let stream = provider.get_stream(&matrix(), &options()).await.unwrap();
    mock.assert_async().await;
    assert_eq!(
        stream.map(|s| s.url),
        Some(format!("{}/fallback/tt0133093", server.url()))
    );
}

#[tokio::test]
async fn test_embed_nothing_reachable_yields_none() {
    let provider = SubtitledEmbedProvider::with_sources(EmbedSources {
        movie: vec![UNREACHABLE.to_string()],
        series: vec![UNREACHABLE.to_string()],
        imdb_fallback: Some(UNREACHABLE.to_string()),
    });

    assert!(provider
        .get_stream(&matrix(), &options())
        .await
        .unwrap()
        .is_none());

    let health = provider.check_health().await;
    assert!(!health.is_online);
}

#[tokio::test]
async fn test_embed_series_requires_episode() {
    let provider = SubtitledEmbedProvider::with_sources(EmbedSources {
        movie: vec![],
        series: vec![UNREACHABLE.to_string()],
        imdb_fallback: None,
    });

    let request = StreamRequest {
        title_id: TitleId::imdb("tt0903747"),
        content_type: ContentType::Series,
        season: None,
        episode: None,
    };
    let err = provider.get_stream(&request, &options()).await.unwrap_err();
    assert!(matches!(err, ProviderError::InvalidRequest(_)));
}
