use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use uuid::Uuid;

/// Builds the shareable `<baseUrl>/join?w=<uuid>&k=<base64url(32B secret)>`
/// link. The secret travels only in this link, never through the server.
pub fn build(base_url: &str, workspace_id: Uuid, secret: &[u8; 32]) -> String {
    let encoded = URL_SAFE_NO_PAD.encode(secret);
    format!("{base_url}/join?w={workspace_id}&k={encoded}")
}

pub fn decode_secret(encoded: &str) -> anyhow::Result<[u8; 32]> {
    let bytes = URL_SAFE_NO_PAD.decode(encoded)?;
    bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("secret must decode to exactly 32 bytes"))
}

pub struct ParsedLink {
    pub workspace_id: Uuid,
    pub secret: [u8; 32],
}

pub fn parse(link: &str) -> anyhow::Result<ParsedLink> {
    let query = link
        .split_once('?')
        .map(|(_, q)| q)
        .ok_or_else(|| anyhow::anyhow!("link has no query string"))?;

    let mut workspace_id = None;
    let mut secret = None;
    for pair in query.split('&') {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("malformed query parameter: {pair}"))?;
        match key {
            "w" => workspace_id = Some(Uuid::parse_str(value)?),
            "k" => {
                let bytes = URL_SAFE_NO_PAD.decode(value)?;
                let array: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| anyhow::anyhow!("secret must be 32 bytes"))?;
                secret = Some(array);
            }
            _ => {}
        }
    }

    Ok(ParsedLink {
        workspace_id: workspace_id.ok_or_else(|| anyhow::anyhow!("link missing 'w' parameter"))?,
        secret: secret.ok_or_else(|| anyhow::anyhow!("link missing 'k' parameter"))?,
    })
}
