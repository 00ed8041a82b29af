// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Page and device context.
//!
//! A [`PageSnapshot`] is the engine's view of the hosting page: URL,
//! referrer, user agent, viewport. The snapshot is injected by the host so
//! the engine never reads browser globals directly.

use serde::{Deserialize, Serialize};

/// A point-in-time capture of the hosting page's context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
	/// Full page URL including query string.
	pub url: String,
	/// Document referrer, if any.
	pub referrer: Option<String>,
	pub user_agent: String,
	pub viewport_width: u32,
	pub viewport_height: u32,
}

impl PageSnapshot {
	/// Returns the path component of the page URL ("/" when unparseable).
	#[must_use]
	pub fn path(&self) -> String {
		match url::Url::parse(&self.url) {
			Ok(parsed) => parsed.path().to_string(),
			// Relative URLs: take everything before the query string.
			Err(_) => {
				let path = self.url.split(['?', '#']).next().unwrap_or("/");
				if path.is_empty() {
					"/".to_string()
				} else {
					path.to_string()
				}
			}
		}
	}
}

/// Coarse page classification derived from the URL path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
	Home,
	Program,
	Admissions,
	Tuition,
	Blog,
	About,
	Contact,
	Other,
}

impl PageType {
	/// Path-prefix lookup table. First match wins.
	const PREFIXES: &'static [(&'static str, PageType)] = &[
		("/programs", PageType::Program),
		("/online-degrees", PageType::Program),
		("/admissions", PageType::Admissions),
		("/tuition", PageType::Tuition),
		("/financial-aid", PageType::Tuition),
		("/blog", PageType::Blog),
		("/about", PageType::About),
		("/contact", PageType::Contact),
	];

	/// Classifies a URL path.
	#[must_use]
	pub fn classify(path: &str) -> Self {
		if path == "/" || path.is_empty() {
			return PageType::Home;
		}
		for (prefix, page_type) in Self::PREFIXES {
			if path.starts_with(prefix) {
				return *page_type;
			}
		}
		PageType::Other
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			PageType::Home => "home",
			PageType::Program => "program",
			PageType::Admissions => "admissions",
			PageType::Tuition => "tuition",
			PageType::Blog => "blog",
			PageType::About => "about",
			PageType::Contact => "contact",
			PageType::Other => "other",
		}
	}
}

impl std::fmt::Display for PageType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// Device class derived from viewport width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
	Mobile,
	Tablet,
	Desktop,
}

impl DeviceClass {
	/// Breakpoints match the site's responsive layout: <768 mobile,
	/// <1024 tablet, else desktop.
	#[must_use]
	pub fn from_viewport_width(width: u32) -> Self {
		if width < 768 {
			DeviceClass::Mobile
		} else if width < 1024 {
			DeviceClass::Tablet
		} else {
			DeviceClass::Desktop
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			DeviceClass::Mobile => "mobile",
			DeviceClass::Tablet => "tablet",
			DeviceClass::Desktop => "desktop",
		}
	}
}

impl std::fmt::Display for DeviceClass {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// Browser and OS sniffed from the user agent, device class from viewport.
///
/// This is telemetry-grade sniffing, not feature detection: a small fixed
/// taxonomy is enough for marketing segmentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceContext {
	pub device: DeviceClass,
	pub browser: String,
	pub os: String,
}

impl DeviceContext {
	#[must_use]
	pub fn sniff(user_agent: &str, viewport_width: u32) -> Self {
		Self {
			device: DeviceClass::from_viewport_width(viewport_width),
			browser: sniff_browser(user_agent).to_string(),
			os: sniff_os(user_agent).to_string(),
		}
	}
}

/// Order matters: Edge and Opera embed "Chrome", Chrome embeds "Safari".
fn sniff_browser(user_agent: &str) -> &'static str {
	if user_agent.contains("Edg/") || user_agent.contains("Edge/") {
		"edge"
	} else if user_agent.contains("OPR/") || user_agent.contains("Opera") {
		"opera"
	} else if user_agent.contains("Firefox/") {
		"firefox"
	} else if user_agent.contains("Chrome/") || user_agent.contains("CriOS") {
		"chrome"
	} else if user_agent.contains("Safari/") {
		"safari"
	} else {
		"other"
	}
}

/// iOS check precedes the macOS check: iPad user agents contain "Mac OS X".
fn sniff_os(user_agent: &str) -> &'static str {
	if user_agent.contains("iPhone") || user_agent.contains("iPad") || user_agent.contains("iOS") {
		"ios"
	} else if user_agent.contains("Android") {
		"android"
	} else if user_agent.contains("Windows") {
		"windows"
	} else if user_agent.contains("Mac OS X") || user_agent.contains("Macintosh") {
		"macos"
	} else if user_agent.contains("Linux") {
		"linux"
	} else {
		"other"
	}
}
