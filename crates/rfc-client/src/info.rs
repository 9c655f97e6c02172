//! Session metadata reported by the transport.

use serde::{Deserialize, Serialize};

/// Attributes negotiated for an open session.
///
/// Serializes with the camelCase keys callers know from the remote system's
/// own tooling, so `serde_json::to_value(info)` yields the familiar mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    /// Local host name.
    pub host: String,
    /// Application server host.
    pub partner_host: String,
    /// System number.
    pub sys_number: String,
    /// System identifier.
    pub sys_id: String,
    /// Client (tenant) number.
    pub client: String,
    /// Logon user, upper-cased by the remote side.
    pub user: String,
    /// One-letter logon language.
    pub language: String,
    /// Trace level.
    pub trace: String,
    /// ISO logon language.
    pub iso_language: String,
    /// Local codepage.
    pub codepage: String,
    /// Remote codepage.
    pub partner_codepage: String,
    /// `C` for client, `S` for server.
    pub rfc_role: String,
    /// Local system type.
    #[serde(rename = "type")]
    pub system_type: String,
    /// Remote system type.
    pub partner_type: String,
    /// Local release.
    pub rel: String,
    /// Remote release.
    pub partner_rel: String,
    /// Remote kernel release.
    pub kernel_rel: String,
    /// Conversation id; changes whenever the session is replaced.
    pub cpic_conv_id: String,
    /// Calling program.
    pub prog_name: String,
    /// Bytes per character on the remote side.
    pub partner_bytes_per_char: String,
}

impl ConnectionInfo {
    /// The attributes as `(key, value)` pairs in a fixed order.
    #[must_use]
    pub fn entries(&self) -> [(&'static str, &str); 20] {
        [
            ("host", self.host.as_str()),
            ("partnerHost", self.partner_host.as_str()),
            ("sysNumber", self.sys_number.as_str()),
            ("sysId", self.sys_id.as_str()),
            ("client", self.client.as_str()),
            ("user", self.user.as_str()),
            ("language", self.language.as_str()),
            ("trace", self.trace.as_str()),
            ("isoLanguage", self.iso_language.as_str()),
            ("codepage", self.codepage.as_str()),
            ("partnerCodepage", self.partner_codepage.as_str()),
            ("rfcRole", self.rfc_role.as_str()),
            ("type", self.system_type.as_str()),
            ("partnerType", self.partner_type.as_str()),
            ("rel", self.rel.as_str()),
            ("partnerRel", self.partner_rel.as_str()),
            ("kernelRel", self.kernel_rel.as_str()),
            ("cpicConvId", self.cpic_conv_id.as_str()),
            ("progName", self.prog_name.as_str()),
            ("partnerBytesPerChar", self.partner_bytes_per_char.as_str()),
        ]
    }
}
