use std::collections::HashMap;

use crate::models::SubscriptionRecord;

/// <push endpoint URL, stored record>
pub type SubscriptionMap = HashMap<String, SubscriptionRecord>;

/// <schedule seconds as decimal string, enabled>
pub type EnabledMap = HashMap<String, bool>;
