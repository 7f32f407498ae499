//! The `Dog` record served by the `dogs` endpoint.

use serde::{Deserialize, Serialize};
use url::Url;

/// A dog listed for sale.
///
/// Every field except `image_url` is required; a listing missing any of them
/// fails to decode, and so does the collection containing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dog {
    pub id: String,
    pub seller_id: String,
    pub about: String,
    /// RFC 3339 date of birth.
    pub birthday: String,
    pub breed: String,
    pub breeder_rating: f64,
    pub cost: f64,
    /// RFC 3339 listing creation time.
    pub created: String,
    pub image_url: Option<Url>,
    pub name: String,
}
