// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parameter optimizer: maps a classified message to a generation plan.

use chatline_config::model::{BackendProfile, RoutingConfig};
use chatline_core::{Category, Classification, GenerationPlan, LengthClass, MessageDescriptor, RouteTier};
use tracing::info;

/// Keyword dispatch with ordered fallthrough.
///
/// Code wins over length: a short code question still needs the precision
/// backend. Either a code keyword in the message or a code classification
/// selects it. Short non-code messages take the fast tier, everything else the
/// general tier.
pub fn route_tier(classification: &Classification, descriptor: &MessageDescriptor) -> RouteTier {
    if descriptor.is_code_request || classification.category == Category::Code {
        RouteTier::Code
    } else if descriptor.length_class == LengthClass::Simple {
        RouteTier::Simple
    } else {
        RouteTier::General
    }
}

/// Pure lookup from route tier to backend profile.
#[derive(Debug, Clone)]
pub struct ParameterOptimizer {
    config: RoutingConfig,
}

impl ParameterOptimizer {
    pub fn new(config: RoutingConfig) -> Self {
        Self { config }
    }

    pub fn profile(&self, tier: RouteTier) -> &BackendProfile {
        match tier {
            RouteTier::Simple => &self.config.fast,
            RouteTier::Code => &self.config.code,
            RouteTier::General => &self.config.general,
        }
    }

    /// Build the plan for a message. Same inputs always give the same plan.
    pub fn plan(
        &self,
        classification: &Classification,
        descriptor: &MessageDescriptor,
    ) -> GenerationPlan {
        let tier = route_tier(classification, descriptor);
        let profile = self.profile(tier);
        info!(
            tier = %tier,
            backend = profile.model.as_str(),
            category = %classification.category,
            source = %classification.source,
            "generation plan selected"
        );
        GenerationPlan {
            tier,
            backend_id: profile.model.clone(),
            temperature: profile.temperature,
            max_tokens: profile.max_tokens,
            context_window: profile.context_window,
        }
    }
}

impl Default for ParameterOptimizer {
    fn default() -> Self {
        Self::new(RoutingConfig::default())
    }
}
