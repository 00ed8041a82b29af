// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Touchpoints and multi-touch attribution.
//!
//! A touchpoint is one marketing-attributable entry into the site. At most
//! one is recorded per browsing session; the ordered list of touchpoints is
//! the visitor's journey, and [`summarize`] derives first-touch, last-touch,
//! and journey-level fields from it on demand.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::SessionId;
use crate::page::PageSnapshot;

/// Campaign sentinel recorded when no campaign parameter is present.
pub const CAMPAIGN_NOT_SET: &str = "not_set";

/// Source and medium recorded for a visit with no referrer and no UTM tags.
pub const SOURCE_DIRECT: &str = "direct";
pub const MEDIUM_NONE: &str = "none";

/// UTM query parameters extracted from a landing URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtmParams {
	pub source: Option<String>,
	pub medium: Option<String>,
	pub campaign: Option<String>,
	pub content: Option<String>,
	pub term: Option<String>,
}

impl UtmParams {
	/// Parses UTM parameters from a URL (absolute or relative).
	///
	/// Unparseable URLs yield the empty set: a bad URL never breaks
	/// attribution, it just records as untagged traffic.
	#[must_use]
	pub fn parse(page_url: &str) -> Self {
		let query = match url::Url::parse(page_url) {
			Ok(parsed) => parsed.query().unwrap_or("").to_string(),
			Err(_) => page_url
				.split_once('?')
				.map(|(_, q)| q.split('#').next().unwrap_or("").to_string())
				.unwrap_or_default(),
		};

		let mut utm = UtmParams::default();
		for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
			if value.is_empty() {
				continue;
			}
			let value = value.into_owned();
			match key.as_ref() {
				"utm_source" => utm.source = Some(value),
				"utm_medium" => utm.medium = Some(value),
				"utm_campaign" => utm.campaign = Some(value),
				"utm_content" => utm.content = Some(value),
				"utm_term" => utm.term = Some(value),
				_ => {}
			}
		}
		utm
	}
}

/// Referrer taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferrerClass {
	/// No referrer at all.
	Direct,
	/// A known search engine.
	Search,
	/// A known social platform.
	Social,
	/// The site's own domain.
	Internal,
	/// Anything else with a parseable host.
	External,
}

/// A classified referrer: its class plus the source/medium it implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferrerInfo {
	pub class: ReferrerClass,
	pub source: String,
	pub medium: String,
	pub domain: Option<String>,
}

const SEARCH_ENGINES: &[(&str, &str)] = &[
	("google.", "google"),
	("bing.", "bing"),
	("yahoo.", "yahoo"),
	("duckduckgo.", "duckduckgo"),
	("baidu.", "baidu"),
	("ecosia.", "ecosia"),
];

const SOCIAL_PLATFORMS: &[(&str, &str)] = &[
	("facebook.", "facebook"),
	("instagram.", "instagram"),
	("twitter.", "twitter"),
	("x.com", "twitter"),
	("t.co", "twitter"),
	("linkedin.", "linkedin"),
	("lnkd.in", "linkedin"),
	("youtube.", "youtube"),
	("tiktok.", "tiktok"),
	("reddit.", "reddit"),
	("pinterest.", "pinterest"),
];

/// Classifies a referrer URL into the fixed taxonomy.
///
/// Classes map to source/medium as follows: no referrer is
/// `direct`/`none`, an internal referrer is `direct`/`internal` (the site
/// does not claim credit for its own navigation), search engines are
/// `<engine>`/`organic`, social platforms are `<platform>`/`social`, and
/// everything else is `<domain>`/`referral`.
#[must_use]
pub fn classify_referrer(referrer: Option<&str>, internal_hosts: &[String]) -> ReferrerInfo {
	let raw = match referrer {
		Some(r) if !r.trim().is_empty() => r,
		_ => {
			return ReferrerInfo {
				class: ReferrerClass::Direct,
				source: SOURCE_DIRECT.to_string(),
				medium: MEDIUM_NONE.to_string(),
				domain: None,
			}
		}
	};

	let host = match url::Url::parse(raw).ok().and_then(|u| u.host_str().map(str::to_string)) {
		Some(host) => host,
		None => {
			// Referrer with no parseable host: treat like direct traffic.
			return ReferrerInfo {
				class: ReferrerClass::Direct,
				source: SOURCE_DIRECT.to_string(),
				medium: MEDIUM_NONE.to_string(),
				domain: None,
			};
		}
	};

	let host_lower = host.to_ascii_lowercase();

	if internal_hosts.iter().any(|internal| {
		let internal = internal.to_ascii_lowercase();
		host_lower == internal || host_lower.ends_with(&format!(".{internal}"))
	}) {
		return ReferrerInfo {
			class: ReferrerClass::Internal,
			source: SOURCE_DIRECT.to_string(),
			medium: "internal".to_string(),
			domain: Some(host),
		};
	}

	for (needle, source) in SEARCH_ENGINES {
		if host_lower.contains(needle) {
			return ReferrerInfo {
				class: ReferrerClass::Search,
				source: (*source).to_string(),
				medium: "organic".to_string(),
				domain: Some(host),
			};
		}
	}

	for (needle, source) in SOCIAL_PLATFORMS {
		if host_lower.contains(needle) {
			return ReferrerInfo {
				class: ReferrerClass::Social,
				source: (*source).to_string(),
				medium: "social".to_string(),
				domain: Some(host),
			};
		}
	}

	ReferrerInfo {
		class: ReferrerClass::External,
		source: host_lower,
		medium: "referral".to_string(),
		domain: Some(host),
	}
}

/// One recorded marketing-attributable entry into the site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Touchpoint {
	pub timestamp: DateTime<Utc>,
	pub source: String,
	pub medium: String,
	pub campaign: String,
	pub content: Option<String>,
	pub term: Option<String>,
	pub referrer_domain: Option<String>,
	pub landing_page: String,
	pub session_id: SessionId,
}

impl Touchpoint {
	/// Builds the candidate touchpoint for a page load.
	///
	/// Precedence: explicit UTM parameters win, then the referrer-derived
	/// source/medium, then `direct`/`none`. The campaign falls back to the
	/// [`CAMPAIGN_NOT_SET`] sentinel.
	#[must_use]
	pub fn from_page(
		page: &PageSnapshot,
		session_id: &SessionId,
		internal_hosts: &[String],
		now: DateTime<Utc>,
	) -> Self {
		let utm = UtmParams::parse(&page.url);
		let referrer = classify_referrer(page.referrer.as_deref(), internal_hosts);

		Self {
			timestamp: now,
			source: utm.source.unwrap_or_else(|| referrer.source.clone()),
			medium: utm.medium.unwrap_or_else(|| referrer.medium.clone()),
			campaign: utm.campaign.unwrap_or_else(|| CAMPAIGN_NOT_SET.to_string()),
			content: utm.content,
			term: utm.term,
			referrer_domain: referrer.domain,
			landing_page: page.path(),
			session_id: session_id.clone(),
		}
	}
}

/// A touchpoint as returned to the caller of attribution initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TouchpointSnapshot {
	pub touchpoint: Touchpoint,
	pub is_first_touch: bool,
	/// Zero-based index of this touchpoint in the journey.
	pub touchpoint_index: usize,
}

/// Derived attribution summary. Never stored; recomputed on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionSummary {
	pub first_touch_source: String,
	pub first_touch_medium: String,
	pub first_touch_campaign: String,
	pub last_touch_source: String,
	pub last_touch_medium: String,
	pub last_touch_campaign: String,
	/// All sources in journey order, joined with " > ".
	pub source_journey: String,
	/// All campaigns in journey order, joined with " > ".
	pub campaign_journey: String,
	pub touchpoint_count: usize,
	/// Whole days between the first and last touch.
	pub days_in_journey: i64,
	/// Last-touch-weighted credit: later touchpoints dominate, so the
	/// primary source is simply the most recent one.
	pub primary_source: String,
}

/// Derives the attribution summary for a journey.
///
/// Returns `None` for an empty journey: no attribution is claimed for a
/// visitor with zero recorded touchpoints.
#[must_use]
pub fn summarize(touchpoints: &[Touchpoint]) -> Option<AttributionSummary> {
	let first = touchpoints.first()?;
	let last = touchpoints.last()?;

	let source_journey = touchpoints
		.iter()
		.map(|t| t.source.as_str())
		.collect::<Vec<_>>()
		.join(" > ");
	let campaign_journey = touchpoints
		.iter()
		.map(|t| t.campaign.as_str())
		.collect::<Vec<_>>()
		.join(" > ");

	Some(AttributionSummary {
		first_touch_source: first.source.clone(),
		first_touch_medium: first.medium.clone(),
		first_touch_campaign: first.campaign.clone(),
		last_touch_source: last.source.clone(),
		last_touch_medium: last.medium.clone(),
		last_touch_campaign: last.campaign.clone(),
		source_journey,
		campaign_journey,
		touchpoint_count: touchpoints.len(),
		days_in_journey: (last.timestamp - first.timestamp).num_days().max(0),
		primary_source: last.source.clone(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn page(url: &str, referrer: Option<&str>) -> PageSnapshot {
		PageSnapshot {
			url: url.to_string(),
			referrer: referrer.map(str::to_string),
			user_agent: "test".to_string(),
			viewport_width: 1280,
			viewport_height: 800,
		}
	}

	fn touchpoint(source: &str, campaign: &str, at: DateTime<Utc>) -> Touchpoint {
		Touchpoint {
			timestamp: at,
			source: source.to_string(),
			medium: "organic".to_string(),
			campaign: campaign.to_string(),
			content: None,
			term: None,
			referrer_domain: None,
			landing_page: "/".to_string(),
			session_id: SessionId::generate(),
		}
	}

	#[test]
	fn test_utm_parse_absolute_url() {
		let utm = UtmParams::parse("https://online.example.edu/?utm_source=google&utm_medium=cpc&utm_campaign=launch&utm_content=ad1&utm_term=mba");
		assert_eq!(utm.source.as_deref(), Some("google"));
		assert_eq!(utm.medium.as_deref(), Some("cpc"));
		assert_eq!(utm.campaign.as_deref(), Some("launch"));
		assert_eq!(utm.content.as_deref(), Some("ad1"));
		assert_eq!(utm.term.as_deref(), Some("mba"));
	}

	#[test]
	fn test_utm_parse_relative_url() {
		let utm = UtmParams::parse("/programs/mba/?utm_source=newsletter#section");
		assert_eq!(utm.source.as_deref(), Some("newsletter"));
		assert_eq!(utm.campaign, None);
	}

	#[test]
	fn test_utm_parse_ignores_empty_values() {
		let utm = UtmParams::parse("https://x.test/?utm_source=&utm_campaign=a");
		assert_eq!(utm.source, None);
		assert_eq!(utm.campaign.as_deref(), Some("a"));
	}

	#[test]
	fn test_utm_parse_decodes_percent_encoding() {
		let utm = UtmParams::parse("https://x.test/?utm_campaign=spring%20launch");
		assert_eq!(utm.campaign.as_deref(), Some("spring launch"));
	}

	#[test]
	fn test_classify_no_referrer_is_direct() {
		let info = classify_referrer(None, &[]);
		assert_eq!(info.class, ReferrerClass::Direct);
		assert_eq!(info.source, "direct");
		assert_eq!(info.medium, "none");
		assert_eq!(info.domain, None);
	}

	#[test]
	fn test_classify_search_engine() {
		let info = classify_referrer(Some("https://www.google.com/search?q=online+mba"), &[]);
		assert_eq!(info.class, ReferrerClass::Search);
		assert_eq!(info.source, "google");
		assert_eq!(info.medium, "organic");
		assert_eq!(info.domain.as_deref(), Some("www.google.com"));
	}

	#[test]
	fn test_classify_social_platform() {
		let info = classify_referrer(Some("https://lnkd.in/abc"), &[]);
		assert_eq!(info.class, ReferrerClass::Social);
		assert_eq!(info.source, "linkedin");
		assert_eq!(info.medium, "social");
	}

	#[test]
	fn test_classify_internal_domain() {
		let internal = vec!["example.edu".to_string()];
		let info = classify_referrer(Some("https://online.example.edu/programs/"), &internal);
		assert_eq!(info.class, ReferrerClass::Internal);
		assert_eq!(info.source, "direct");
		assert_eq!(info.medium, "internal");
	}

	#[test]
	fn test_classify_external_domain() {
		let info = classify_referrer(Some("https://news.ycombinator.com/item?id=1"), &[]);
		assert_eq!(info.class, ReferrerClass::External);
		assert_eq!(info.source, "news.ycombinator.com");
		assert_eq!(info.medium, "referral");
	}

	#[test]
	fn test_classify_unparseable_referrer_is_direct() {
		let info = classify_referrer(Some("not a url"), &[]);
		assert_eq!(info.class, ReferrerClass::Direct);
	}

	#[test]
	fn test_touchpoint_utm_wins_over_referrer() {
		let session = SessionId::generate();
		let tp = Touchpoint::from_page(
			&page(
				"https://online.example.edu/?utm_source=newsletter&utm_medium=email",
				Some("https://www.google.com/"),
			),
			&session,
			&[],
			Utc::now(),
		);
		assert_eq!(tp.source, "newsletter");
		assert_eq!(tp.medium, "email");
		assert_eq!(tp.campaign, CAMPAIGN_NOT_SET);
		assert_eq!(tp.referrer_domain.as_deref(), Some("www.google.com"));
	}

	#[test]
	fn test_touchpoint_referrer_fallback() {
		let session = SessionId::generate();
		let tp = Touchpoint::from_page(
			&page("https://online.example.edu/blog/", Some("https://www.bing.com/search")),
			&session,
			&[],
			Utc::now(),
		);
		assert_eq!(tp.source, "bing");
		assert_eq!(tp.medium, "organic");
		assert_eq!(tp.landing_page, "/blog/");
	}

	#[test]
	fn test_touchpoint_direct_fallback() {
		let session = SessionId::generate();
		let tp = Touchpoint::from_page(&page("https://online.example.edu/", None), &session, &[], Utc::now());
		assert_eq!(tp.source, SOURCE_DIRECT);
		assert_eq!(tp.medium, MEDIUM_NONE);
		assert_eq!(tp.campaign, CAMPAIGN_NOT_SET);
	}

	#[test]
	fn test_summarize_empty_is_none() {
		assert_eq!(summarize(&[]), None);
	}

	#[test]
	fn test_summarize_first_and_last_touch() {
		let start = Utc::now() - chrono::Duration::days(3);
		let touchpoints = vec![
			touchpoint("google", "a", start),
			touchpoint("direct", CAMPAIGN_NOT_SET, Utc::now()),
		];
		let summary = summarize(&touchpoints).unwrap();
		assert_eq!(summary.first_touch_source, "google");
		assert_eq!(summary.first_touch_campaign, "a");
		assert_eq!(summary.last_touch_source, "direct");
		assert_eq!(summary.touchpoint_count, 2);
		assert_eq!(summary.source_journey, "google > direct");
		assert_eq!(summary.campaign_journey, "a > not_set");
		assert_eq!(summary.days_in_journey, 3);
		assert_eq!(summary.primary_source, "direct");
	}

	#[test]
	fn test_summarize_single_touchpoint() {
		let touchpoints = vec![touchpoint("facebook", "social_push", Utc::now())];
		let summary = summarize(&touchpoints).unwrap();
		assert_eq!(summary.first_touch_source, "facebook");
		assert_eq!(summary.last_touch_source, "facebook");
		assert_eq!(summary.primary_source, "facebook");
		assert_eq!(summary.days_in_journey, 0);
	}

	proptest! {
		#[test]
		fn summarize_count_matches_input(n in 1usize..20) {
			let touchpoints: Vec<_> = (0..n)
				.map(|i| touchpoint(&format!("s{i}"), "c", Utc::now()))
				.collect();
			let summary = summarize(&touchpoints).unwrap();
			prop_assert_eq!(summary.touchpoint_count, n);
		}

		#[test]
		fn primary_source_is_last_touch(sources in proptest::collection::vec("[a-z]{1,10}", 1..10)) {
			let touchpoints: Vec<_> = sources
				.iter()
				.map(|s| touchpoint(s, "c", Utc::now()))
				.collect();
			let summary = summarize(&touchpoints).unwrap();
			prop_assert_eq!(&summary.primary_source, sources.last().unwrap());
			prop_assert_eq!(&summary.last_touch_source, sources.last().unwrap());
			prop_assert_eq!(&summary.first_touch_source, sources.first().unwrap());
		}

		#[test]
		fn utm_parse_never_panics(url in ".{0,120}") {
			let _ = UtmParams::parse(&url);
		}

		#[test]
		fn classify_never_panics(referrer in ".{0,120}") {
			let _ = classify_referrer(Some(&referrer), &["example.edu".to_string()]);
		}
	}
}
