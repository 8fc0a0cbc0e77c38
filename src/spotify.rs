//! Streaming service Web API client (top tracks + profile).
//!
//! Only the read side is implemented. The bearer token comes from the
//! caller; obtaining and refreshing it is outside this crate.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::collector::{TopTrack, TopTracksSource};
use crate::db::models::TimeRange;

/// `GET /me/top/tracks` response (partial).
#[derive(Debug, Deserialize)]
struct TopTracksResponse {
    items: Vec<ApiTrack>,
}

#[derive(Debug, Deserialize)]
struct ApiTrack {
    /// Null for local files.
    id: Option<String>,
    name: String,
    #[serde(default)]
    artists: Vec<ApiArtist>,
    album: Option<ApiAlbum>,
    #[serde(default)]
    popularity: i64,
    #[serde(default)]
    duration_ms: i64,
    #[serde(default)]
    explicit: bool,
    #[serde(default)]
    external_urls: ExternalUrls,
}

#[derive(Debug, Deserialize)]
struct ApiArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiAlbum {
    name: Option<String>,
    release_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

/// `GET /me` response (partial).
#[derive(Debug, Deserialize)]
struct UserProfile {
    id: String,
    display_name: Option<String>,
}

pub struct SpotifyClient {
    agent: ureq::Agent,
    api_base: String,
    access_token: String,
}

impl SpotifyClient {
    pub fn new(api_base: &str, access_token: &str) -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            api_base: api_base.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        }
    }

    /// Display name and id of the authorized user, e.g. "Jo (jo123)".
    pub fn current_user(&self) -> Result<String> {
        let url = format!("{}/me", self.api_base);
        let profile: UserProfile = self
            .agent
            .get(&url)
            .header("Authorization", self.bearer())
            .call()
            .context("HTTP request failed for /me")?
            .body_mut()
            .read_json()
            .context("Failed to parse user profile")?;

        Ok(match profile.display_name {
            Some(name) => format!("{name} ({})", profile.id),
            None => profile.id,
        })
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl TopTracksSource for SpotifyClient {
    fn top_tracks(&self, range: TimeRange, limit: usize) -> Result<Vec<TopTrack>> {
        let url = format!("{}/me/top/tracks", self.api_base);
        log::debug!("Fetching {url} ({range}, limit {limit})");

        let response: TopTracksResponse = self
            .agent
            .get(&url)
            .header("Authorization", self.bearer())
            .query("limit", limit.to_string())
            .query("time_range", range.as_str())
            .call()
            .with_context(|| format!("HTTP request failed for {range}"))?
            .body_mut()
            .read_json()
            .with_context(|| format!("Failed to parse top tracks for {range}"))?;

        Ok(convert_items(response.items))
    }
}

fn convert_items(items: Vec<ApiTrack>) -> Vec<TopTrack> {
    items
        .into_iter()
        .map(|item| {
            let (album_name, release_date) = match item.album {
                Some(album) => (album.name, album.release_date),
                None => (None, None),
            };
            TopTrack {
                id: item.id,
                name: item.name,
                artists: item.artists.into_iter().map(|a| a.name).collect(),
                album_name,
                release_date,
                popularity: item.popularity,
                duration_ms: item.duration_ms,
                explicit: item.explicit,
                url: item.external_urls.spotify,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_top_tracks_response() {
        let json = r#"{
            "items": [
                {
                    "id": "4uLU6hMCjMI75M1A2tKUQC",
                    "name": "Holocene",
                    "artists": [{"name": "Bon Iver"}, {"name": "Guest"}],
                    "album": {"name": "Bon Iver, Bon Iver", "release_date": "2011-06-17"},
                    "popularity": 71,
                    "duration_ms": 336613,
                    "explicit": false,
                    "external_urls": {"spotify": "https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC"}
                },
                {
                    "id": null,
                    "name": "Local demo",
                    "artists": [],
                    "album": null
                }
            ],
            "total": 2
        }"#;
        let resp: TopTracksResponse = serde_json::from_str(json).unwrap();
        let items = convert_items(resp.items);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id.as_deref(), Some("4uLU6hMCjMI75M1A2tKUQC"));
        assert_eq!(items[0].artists, vec!["Bon Iver", "Guest"]);
        assert_eq!(items[0].release_date.as_deref(), Some("2011-06-17"));
        assert_eq!(items[0].popularity, 71);
        assert!(items[1].id.is_none());
        assert!(items[1].album_name.is_none());
        assert!(items[1].url.is_none());
    }

    #[test]
    fn test_profile_display() {
        let p: UserProfile = serde_json::from_str(r#"{"id": "jo123", "display_name": null}"#).unwrap();
        assert!(p.display_name.is_none());
        assert_eq!(p.id, "jo123");
    }

    #[test]
    fn test_api_base_trailing_slash() {
        let c = SpotifyClient::new("https://api.example.com/v1/", "tok");
        assert_eq!(c.api_base, "https://api.example.com/v1");
        assert_eq!(c.bearer(), "Bearer tok");
    }
}
