//! Typed contents of `main.json`
//!
//! Mirrors the config file read by the presence binary. Every section and
//! every field is optional; whatever is left unset stays out of the
//! rendered file so the binary applies its own fallbacks.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;

/// Image expiration the presence binary assumes when `imgbb.expiration`
/// is unset (5 days). Never written into the rendered config.
pub const DEFAULT_IMGBB_EXPIRATION: u64 = 432_000;

/// Top level of the rendered config
#[skip_serializing_none]
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructuredConfig {
    /// Jellyfin connection
    pub jellyfin: Option<Jellyfin>,

    /// Discord presence
    pub discord: Option<Discord>,

    /// ImgBB uploads
    pub imgbb: Option<ImgBB>,

    /// Presence images
    pub images: Option<Images>,
}

/// Jellyfin server connection and display settings
#[skip_serializing_none]
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Jellyfin {
    /// URL of the Jellyfin server
    pub url: Option<String>,

    /// API key, may instead come from `jellyfinSecretPath`
    pub api_key: Option<String>,

    /// User (or users) whose sessions are shown
    pub username: Option<Username>,

    /// Accept self signed TLS certificates
    pub self_signed_cert: Option<bool>,

    /// Show only the episode name
    pub show_simple: Option<bool>,

    /// Pad season and episode numbers below 10 with a "0"
    pub append_prefix: Option<bool>,

    /// Put a divider between season and episode numbers
    pub add_divider: Option<bool>,

    /// How music is shown
    pub music: Option<DisplayOptions>,

    /// How movies are shown
    pub movies: Option<DisplayOptions>,

    /// How episodes are shown
    pub episodes: Option<DisplayOptions>,

    /// What never gets shown
    pub blacklist: Option<Blacklist>,
}

/// A single user or a list of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Username {
    /// Comma separated usernames
    String(String),

    /// One username per entry
    List(Vec<String>),
}

/// What to show for a media type, and how to join it
#[skip_serializing_none]
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisplayOptions {
    /// Fields to show
    pub display: Option<Display>,

    /// Placed between the artist(s) and the displayed fields
    pub separator: Option<String>,
}

/// Display fields, comma separated, as a list or as a custom format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Display {
    /// Comma separated fields
    String(String),

    /// One field per entry
    List(Vec<String>),

    /// Custom display format, passed through as written
    CustomFormat(Map<String, Value>),
}

/// Media types and libraries that are never shown
#[skip_serializing_none]
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Blacklist {
    /// Media types to hide
    pub media_types: Option<Vec<String>>,

    /// Library names to hide
    pub libraries: Option<Vec<String>>,
}

/// Discord presence settings
#[skip_serializing_none]
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Discord {
    /// Custom application ID
    pub application_id: Option<String>,

    /// Keep the status up while media is paused
    pub show_paused: Option<bool>,

    /// Buttons shown under the status
    pub buttons: Option<Vec<Button>>,

    /// Hover text of the status image, `{version}` gets substituted
    pub image_text: Option<String>,
}

/// Presence button
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Button {
    /// Button label
    pub name: String,

    /// Link the button opens
    pub url: String,
}

/// ImgBB upload settings
#[skip_serializing_none]
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImgBB {
    /// API token, may instead come from `imgbbSecretPath`
    pub api_token: Option<String>,

    /// Seconds before an uploaded image is deleted, see
    /// [`DEFAULT_IMGBB_EXPIRATION`]
    pub expiration: Option<u64>,
}

/// Image settings
#[skip_serializing_none]
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Images {
    /// Show images at all
    pub enable_images: Option<bool>,

    /// Upload images to ImgBB instead of linking the server
    pub imgbb_images: Option<bool>,

    /// Icon shown while paused
    pub pause_icon_image: Option<String>,

    /// Fallback image when images are off or the API fails
    pub default_image: Option<String>,

    /// Override of the default image for episodes
    pub episode_image: Option<String>,
    /// Override of the default image for movies
    pub movie_image: Option<String>,
    /// Override of the default image for live tv
    pub tv_image: Option<String>,
    /// Override of the default image for music
    pub music_image: Option<String>,
    /// Override of the default image for audio books
    pub audio_book_image: Option<String>,
    /// Override of the default image for books
    pub book_image: Option<String>,
}
