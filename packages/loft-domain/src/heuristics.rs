use regex::Regex;

use crate::profile::{AttributeProfile, EnrichmentMethod, Firmness, Material, SourceEvidence};

#[derive(Clone, Copy, Debug)]
enum RuleTarget {
	Firmness(Firmness),
	HeightInches,
	HeightCentimeters,
	Material(Material),
	Certification(&'static str),
	Feature(&'static str),
	SupportFeature(&'static str),
}

struct Rule {
	name: &'static str,
	pattern: &'static str,
	target: RuleTarget,
	confidence: f32,
}

/// The ordered rule table. Confidences are calibrated by pattern
/// specificity; compound firmness phrases outrank single words.
fn rules() -> Vec<Rule> {
	vec![
		Rule {
			name: "firmness",
			pattern: r"\b(medium.soft|medium soft|medium plush)\b",
			target: RuleTarget::Firmness(Firmness::MediumSoft),
			confidence: 0.9,
		},
		Rule {
			name: "firmness",
			pattern: r"\b(medium.firm|medium firm|firm.medium)\b",
			target: RuleTarget::Firmness(Firmness::MediumFirm),
			confidence: 0.9,
		},
		Rule {
			name: "firmness",
			pattern: r"\b(plush|soft|gentle|cloud)\b",
			target: RuleTarget::Firmness(Firmness::Soft),
			confidence: 0.85,
		},
		Rule {
			name: "firmness",
			pattern: r"\b(firm|extra.firm|supportive)\b",
			target: RuleTarget::Firmness(Firmness::Firm),
			confidence: 0.85,
		},
		Rule {
			name: "firmness",
			pattern: r"\b(medium|balanced|universal)\b",
			target: RuleTarget::Firmness(Firmness::Medium),
			confidence: 0.8,
		},
		Rule {
			name: "height",
			pattern: r#"(\d+(?:\.\d+)?)\s*(?:inch|inches|in|")"#,
			target: RuleTarget::HeightInches,
			confidence: 0.95,
		},
		Rule {
			name: "height",
			pattern: r"(\d+(?:\.\d+)?)\s*(?:cm|centimeter|centimeters)\b",
			target: RuleTarget::HeightCentimeters,
			confidence: 0.9,
		},
		Rule {
			name: "material",
			pattern: r"\b(memory.foam|visco.?elastic)\b",
			target: RuleTarget::Material(Material::MemoryFoam),
			confidence: 0.95,
		},
		Rule {
			name: "material",
			pattern: r"\b(natural.latex|100%.latex|organic.latex|latex)\b",
			target: RuleTarget::Material(Material::Latex),
			confidence: 0.9,
		},
		Rule {
			name: "material",
			pattern: r"\b(gel.foam|gel.memory|gel.infused)\b",
			target: RuleTarget::Material(Material::GelFoam),
			confidence: 0.9,
		},
		Rule {
			name: "material",
			pattern: r"\b(inner.?spring|coil.spring|traditional.spring)\b",
			target: RuleTarget::Material(Material::Innerspring),
			confidence: 0.9,
		},
		Rule {
			name: "material",
			pattern: r"\b(hybrid)\b",
			target: RuleTarget::Material(Material::Hybrid),
			confidence: 0.85,
		},
		Rule {
			name: "certification",
			pattern: r"\b(certipur.?us|certi.?pur)\b",
			target: RuleTarget::Certification("CertiPUR-US"),
			confidence: 0.95,
		},
		Rule {
			name: "certification",
			pattern: r"\b(oeko.?tex)\b",
			target: RuleTarget::Certification("OEKO-TEX"),
			confidence: 0.95,
		},
		Rule {
			name: "certification",
			pattern: r"\b(greenguard|green guard)\b",
			target: RuleTarget::Certification("GREENGUARD"),
			confidence: 0.95,
		},
		Rule {
			name: "certification",
			pattern: r"\b(gots|global organic textile)\b",
			target: RuleTarget::Certification("GOTS"),
			confidence: 0.9,
		},
		Rule {
			name: "certification",
			pattern: r"\b(gols|global organic latex)\b",
			target: RuleTarget::Certification("GOLS"),
			confidence: 0.9,
		},
		Rule {
			name: "cooling",
			pattern: r"\b(gel|cooling.gel|temperature.regulating)\b",
			target: RuleTarget::Feature("cooling-gel"),
			confidence: 0.8,
		},
		Rule {
			name: "cooling",
			pattern: r"\b(pcm|phase.change|thermal)\b",
			target: RuleTarget::Feature("cooling-gel"),
			confidence: 0.9,
		},
		Rule {
			name: "cooling",
			pattern: r"\b(graphite)\b",
			target: RuleTarget::Feature("graphite-infused"),
			confidence: 0.8,
		},
		Rule {
			name: "cooling",
			pattern: r"\b(copper)\b",
			target: RuleTarget::Feature("copper-infused"),
			confidence: 0.8,
		},
		Rule {
			name: "pressure relief",
			pattern: r"\b(pressure.relief|body.contouring|contour|conforming)\b",
			target: RuleTarget::Feature("pressure-relief"),
			confidence: 0.85,
		},
		Rule {
			name: "pressure relief",
			pattern: r"\b(memory.foam|visco)\b",
			target: RuleTarget::Feature("pressure-relief"),
			confidence: 0.7,
		},
		Rule {
			name: "motion isolation",
			pattern: r"\b(motion.isolation|motion.transfer|partner.disturbance|undisturbed.sleep)\b",
			target: RuleTarget::Feature("motion-isolation"),
			confidence: 0.9,
		},
		Rule {
			name: "edge support",
			pattern: r"\b(edge.support|edge.to.edge|perimeter.support|sitting.edge)\b",
			target: RuleTarget::Feature("edge-support"),
			confidence: 0.9,
		},
		Rule {
			name: "zoned support",
			pattern: r"\b(zoned|targeted.support|variable.firmness|body.mapping)\b",
			target: RuleTarget::Feature("zoned-support"),
			confidence: 0.9,
		},
		Rule {
			name: "organic",
			pattern: r"\b(organic|100%.natural|chemical.free)\b",
			target: RuleTarget::Feature("organic-materials"),
			confidence: 0.8,
		},
		Rule {
			name: "coil system",
			pattern: r"\b(pocketed.coil|pocket.coil|individual.coil)\b",
			target: RuleTarget::SupportFeature("pocketed-coils"),
			confidence: 0.9,
		},
		Rule {
			name: "coil system",
			pattern: r"\b(bonnell.coil|hourglass.coil)\b",
			target: RuleTarget::SupportFeature("bonnell-coils"),
			confidence: 0.9,
		},
		Rule {
			name: "coil system",
			pattern: r"\b(continuous.coil|helical.coil)\b",
			target: RuleTarget::SupportFeature("continuous-coils"),
			confidence: 0.9,
		},
		Rule {
			name: "support",
			pattern: r"\b(edge.reinforcement|edge.guard)\b",
			target: RuleTarget::SupportFeature("perimeter-edge-support"),
			confidence: 0.85,
		},
		Rule {
			name: "support",
			pattern: r"\b(center.support|center.beam|middle.support)\b",
			target: RuleTarget::SupportFeature("center-support-beam"),
			confidence: 0.9,
		},
	]
}

/// Pattern/keyword extraction over the combined lowercased item text. Each
/// fired rule contributes its calibrated confidence; the profile confidence
/// is the mean over fired rules, zero when nothing fired.
pub struct HeuristicExtractor {
	rules: Vec<Rule>,
}
impl Default for HeuristicExtractor {
	fn default() -> Self {
		Self { rules: rules() }
	}
}
impl HeuristicExtractor {
	pub fn extract(&self, text: &str) -> AttributeProfile {
		let mut profile = AttributeProfile::default();

		profile.enrichment_method = EnrichmentMethod::Heuristic;

		let mut fired = Vec::new();
		let mut firmness_confidence = 0.0_f32;
		let mut height_confidence = 0.0_f32;
		let mut material_confidence = 0.0_f32;

		for rule in &self.rules {
			let Ok(pattern) = Regex::new(rule.pattern) else {
				continue;
			};
			let Some(captures) = pattern.captures(text) else {
				continue;
			};
			let matched = captures.get(0).map(|m| m.as_str().to_string()).unwrap_or_default();

			match rule.target {
				RuleTarget::Firmness(firmness) =>
					if rule.confidence > firmness_confidence {
						profile.firmness = Some(firmness);
						firmness_confidence = rule.confidence;
					},
				RuleTarget::HeightInches | RuleTarget::HeightCentimeters => {
					let Some(number) =
						captures.get(1).and_then(|m| m.as_str().parse::<f64>().ok())
					else {
						continue;
					};
					let height = match rule.target {
						RuleTarget::HeightCentimeters => {
							format!("{} inches", (number / 2.54).round() as i64)
						},
						_ if number.fract() == 0.0 => format!("{} inches", number as i64),
						_ => format!("{number} inches"),
					};

					if rule.confidence > height_confidence {
						profile.height = Some(height);
						height_confidence = rule.confidence;
					}
				},
				RuleTarget::Material(material) =>
					if rule.confidence > material_confidence {
						profile.material = Some(material);
						material_confidence = rule.confidence;
					},
				RuleTarget::Certification(certification) => {
					profile.certifications.insert(certification.to_string());
				},
				RuleTarget::Feature(feature) => {
					profile.features.insert(feature.to_string());
				},
				RuleTarget::SupportFeature(feature) => {
					profile.support_features.insert(feature.to_string());
				},
			}

			fired.push((rule.name, matched, rule.confidence));
		}

		if fired.is_empty() {
			return profile;
		}

		let total: f32 = fired.iter().map(|(_, _, confidence)| confidence).sum();

		profile.confidence = (total / fired.len() as f32).min(1.0);
		profile.source_evidence = fired
			.into_iter()
			.map(|(name, matched, confidence)| SourceEvidence {
				source: format!("rule:{name}"),
				evidence: matched,
				confidence,
			})
			.collect();

		profile
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn compound_firmness_outranks_single_word() {
		let profile =
			HeuristicExtractor::default().extract("a medium firm mattress with balanced support");

		assert_eq!(profile.firmness, Some(Firmness::MediumFirm));
	}

	#[test]
	fn no_rule_fired_means_zero_confidence() {
		let profile = HeuristicExtractor::default().extract("sleep co. model 7");

		assert!(profile.is_empty());
		assert_eq!(profile.confidence, 0.0);
	}

	#[test]
	fn confidence_is_mean_of_fired_rules() {
		// Fires exactly the inch height rule (0.95) and the hybrid rule (0.85).
		let profile = HeuristicExtractor::default().extract("12 inch hybrid");

		assert_eq!(profile.height.as_deref(), Some("12 inches"));
		assert_eq!(profile.material, Some(Material::Hybrid));
		assert!((profile.confidence - 0.9).abs() < 1e-6);
	}

	#[test]
	fn set_attributes_union_across_rules() {
		let profile = HeuristicExtractor::default()
			.extract("certipur-us certified gel mattress with pocketed coil core and edge support");

		assert!(profile.certifications.contains("CertiPUR-US"));
		assert!(profile.features.contains("cooling-gel"));
		assert!(profile.features.contains("edge-support"));
		assert!(profile.support_features.contains("pocketed-coils"));
	}

	#[test]
	fn centimeter_height_converts_to_inches() {
		let profile = HeuristicExtractor::default().extract("profile height 25 cm");

		assert_eq!(profile.height.as_deref(), Some("10 inches"));
	}

	#[test]
	fn fired_rules_record_source_evidence() {
		let profile = HeuristicExtractor::default().extract("memory foam comfort");

		assert!(!profile.source_evidence.is_empty());
		assert!(profile.source_evidence.iter().all(|evidence| evidence.confidence > 0.0));
	}
}
