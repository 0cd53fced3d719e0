//! Access-tier field redaction for tool payloads.

use grantscout_core::AccessTier;
use serde_json::Value;

const EMAIL_FIELDS: &[&str] = &["email", "pi_email", "po_email", "contact_email"];
const ABSTRACT_FIELDS: &[&str] = &["abstract", "abstract_text", "brief_summary"];

/// Remove fields the tier may not see, at any depth.
pub fn redact(value: &mut Value, tier: &AccessTier) {
    if tier.can_see_emails && tier.can_see_abstracts {
        return;
    }
    strip(value, tier);
}

fn strip(value: &mut Value, tier: &AccessTier) {
    match value {
        Value::Object(map) => {
            if !tier.can_see_emails {
                for field in EMAIL_FIELDS {
                    map.remove(*field);
                }
            }
            if !tier.can_see_abstracts {
                for field in ABSTRACT_FIELDS {
                    map.remove(*field);
                }
            }
            for child in map.values_mut() {
                strip(child, tier);
            }
        }
        Value::Array(items) => {
            for item in items {
                strip(item, tier);
            }
        }
        _ => {}
    }
}
