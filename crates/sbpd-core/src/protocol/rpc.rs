//! JSON-RPC request envelopes for the server's `slim.request` method.
//!
//! Every command is sent as:
//!
//! ```json
//! {"id":1,"method":"slim.request","params":["<player MAC>",<fragment>]}
//! ```
//!
//! where `<fragment>` is a JSON array of command words such as
//! `["button","volume_up"]`.

use serde::Serialize;
use serde_json::Value;

/// Request id sent with every envelope; responses are not correlated.
pub const REQUEST_ID: u32 = 1;

/// The server method that executes player commands.
pub const METHOD: &str = "slim.request";

#[derive(Serialize)]
struct Envelope<'a> {
    id: u32,
    method: &'static str,
    params: (&'a str, Value),
}

/// Wraps a command `fragment` addressed to the player `mac` in a request
/// envelope.
///
/// The fragment is parsed first, so a malformed fragment never reaches the
/// wire.
///
/// # Errors
///
/// Returns a [`serde_json::Error`] if `fragment` is not valid JSON.
pub fn build_request(mac: &str, fragment: &str) -> Result<String, serde_json::Error> {
    let fragment: Value = serde_json::from_str(fragment)?;
    serde_json::to_string(&Envelope {
        id: REQUEST_ID,
        method: METHOD,
        params: (mac, fragment),
    })
}
