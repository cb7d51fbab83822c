//! Subscription-tier feature gating.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::models::SubscriptionTier;

/// TierPermissions
///
/// Capability flags granted by a subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TierPermissions {
    pub can_chat_with_buyers: bool,
    pub can_chat_premium_buyers: bool,
    pub can_chat_luxury_buyers: bool,
    pub can_post_in_premium_collection: bool,
    pub can_post_in_luxury_collection: bool,
}

const BASIC: TierPermissions = TierPermissions {
    can_chat_with_buyers: true,
    can_chat_premium_buyers: false,
    can_chat_luxury_buyers: false,
    can_post_in_premium_collection: false,
    can_post_in_luxury_collection: false,
};

const PREMIUM: TierPermissions = TierPermissions {
    can_chat_with_buyers: true,
    can_chat_premium_buyers: true,
    can_chat_luxury_buyers: false,
    can_post_in_premium_collection: true,
    can_post_in_luxury_collection: false,
};

const LUXURY: TierPermissions = TierPermissions {
    can_chat_with_buyers: true,
    can_chat_premium_buyers: true,
    can_chat_luxury_buyers: true,
    can_post_in_premium_collection: true,
    can_post_in_luxury_collection: true,
};

/// BuyerType
///
/// Segment of the buyer a dealer wants to open a conversation with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BuyerType {
    #[default]
    Regular,
    Premium,
    Luxury,
}

impl SubscriptionTier {
    /// Ordinal used for "at least this tier" checks.
    pub fn level(&self) -> u8 {
        match self {
            SubscriptionTier::Basic => 0,
            SubscriptionTier::Premium => 1,
            SubscriptionTier::Luxury => 2,
        }
    }

    pub fn satisfies(&self, required: SubscriptionTier) -> bool {
        self.level() >= required.level()
    }

    pub fn permissions(&self) -> &'static TierPermissions {
        match self {
            SubscriptionTier::Basic => &BASIC,
            SubscriptionTier::Premium => &PREMIUM,
            SubscriptionTier::Luxury => &LUXURY,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SubscriptionTier::Basic => "Can only chat with buyers viewing their verified listings",
            SubscriptionTier::Premium => {
                "Can post in Premium Verified Collection and chat with premium buyers"
            }
            SubscriptionTier::Luxury => {
                "Full access: Luxury + Premium Collection posting + chat all buyer tiers"
            }
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SubscriptionTier::Basic => "Verified Dealer",
            SubscriptionTier::Premium => "Premium Dealer",
            SubscriptionTier::Luxury => "Luxury Dealer",
        }
    }

    pub fn benefits(&self) -> &'static [&'static str] {
        match self {
            SubscriptionTier::Basic => &[
                "Chat with all your car buyers",
                "List unlimited verified cars",
                "Basic dealer dashboard",
                "Standard support",
            ],
            SubscriptionTier::Premium => &[
                "Everything in Verified tier",
                "Post in Premium Verified Collection",
                "Chat with premium buyers",
                "Enhanced listing visibility",
                "Priority support",
                "Advanced analytics",
            ],
            SubscriptionTier::Luxury => &[
                "Everything in Premium tier",
                "Post in Luxury Collection",
                "Chat with luxury buyers",
                "Maximum listing visibility",
                "VIP support (24/7)",
                "Premium analytics dashboard",
                "Featured dealer badge",
            ],
        }
    }

    /// Name of the storefront collection reserved for this tier.
    pub fn collection_name(&self) -> &'static str {
        match self {
            SubscriptionTier::Basic => "Verified",
            SubscriptionTier::Premium => "Premium Verified",
            SubscriptionTier::Luxury => "Luxury",
        }
    }

    /// can_post_in
    ///
    /// Whether a dealer on this tier may place a listing in `collection`.
    /// `Basic` is not a collection, so everyone may "post" there.
    pub fn can_post_in(&self, collection: SubscriptionTier) -> bool {
        let rules = self.permissions();
        match collection {
            SubscriptionTier::Basic => true,
            SubscriptionTier::Premium => rules.can_post_in_premium_collection,
            SubscriptionTier::Luxury => rules.can_post_in_luxury_collection,
        }
    }
}

/// DealerFeature
///
/// Dashboard sections. Some are locked behind a minimum tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum DealerFeature {
    Dashboard,
    Subscription,
    Inventory,
    AddCar,
    Analytics,
    Messages,
    Earnings,
    Profile,
}

impl DealerFeature {
    pub const ALL: [DealerFeature; 8] = [
        DealerFeature::Dashboard,
        DealerFeature::Subscription,
        DealerFeature::Inventory,
        DealerFeature::AddCar,
        DealerFeature::Analytics,
        DealerFeature::Messages,
        DealerFeature::Earnings,
        DealerFeature::Profile,
    ];

    pub fn required_tier(&self) -> Option<SubscriptionTier> {
        match self {
            DealerFeature::Analytics | DealerFeature::Messages | DealerFeature::Earnings => {
                Some(SubscriptionTier::Premium)
            }
            _ => None,
        }
    }

    pub fn is_unlocked_for(&self, tier: SubscriptionTier) -> bool {
        self.required_tier()
            .is_none_or(|required| tier.satisfies(required))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FeatureAccess {
    pub feature: DealerFeature,
    pub requires_tier: Option<SubscriptionTier>,
    pub unlocked: bool,
}

pub fn can_chat_with_buyer(tier: SubscriptionTier, buyer: BuyerType) -> bool {
    let rules = tier.permissions();
    match buyer {
        BuyerType::Regular => rules.can_chat_with_buyers,
        BuyerType::Premium => rules.can_chat_premium_buyers,
        BuyerType::Luxury => rules.can_chat_luxury_buyers,
    }
}

/// DealerPermissionsResponse
///
/// Output of `GET /api/dealer/permissions`; drives which dashboard sections are unlocked.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DealerPermissionsResponse {
    pub tier: SubscriptionTier,
    pub display_name: String,
    pub description: String,
    pub permissions: TierPermissions,
    pub benefits: Vec<String>,
    pub features: Vec<FeatureAccess>,
}

impl From<SubscriptionTier> for DealerPermissionsResponse {
    fn from(tier: SubscriptionTier) -> Self {
        Self {
            tier,
            display_name: tier.display_name().to_string(),
            description: tier.description().to_string(),
            permissions: *tier.permissions(),
            benefits: tier.benefits().iter().map(|b| b.to_string()).collect(),
            features: DealerFeature::ALL
                .iter()
                .map(|feature| FeatureAccess {
                    feature: *feature,
                    requires_tier: feature.required_tier(),
                    unlocked: feature.is_unlocked_for(tier),
                })
                .collect(),
        }
    }
}
