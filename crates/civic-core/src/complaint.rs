//! Complaints: the citizen-submitted issue records at the centre of the
//! portal.
//!
//! A complaint's `history` is an append-only audit trail. It is seeded with a
//! single `pending` entry on creation and grows by exactly one entry per status
//! change; earlier entries are never rewritten.

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use chrono::{DateTime, Datelike, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result};

// ─── Enums ───────────────────────────────────────────────────────────────────

/// Lifecycle status of a complaint.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ComplaintStatus {
  Pending,
  Assigned,
  InProgress,
  Resolved,
  Closed,
}

impl ComplaintStatus {
  pub const ALL: [Self; 5] = [
    Self::Pending,
    Self::Assigned,
    Self::InProgress,
    Self::Resolved,
    Self::Closed,
  ];
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
  Low,
  #[default]
  Medium,
  High,
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// One status transition in a complaint's audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
  pub timestamp:  DateTime<Utc>,
  pub status:     ComplaintStatus,
  pub notes:      String,
  pub updated_by: String,
}

/// Who filed the complaint. Tracking by phone keys off `phone`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submitter {
  pub name:  String,
  pub phone: String,
  pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Complaint {
  /// `TSC` + year + six digits, e.g. `TSC2026004217`.
  pub id:                   String,
  pub title:                String,
  pub description:          String,
  pub category:             String,
  pub subcategory:          Option<String>,
  /// Free text, or `"lat, lon"` when captured from a device.
  pub location:             String,
  pub landmark:             Option<String>,
  pub priority:             Priority,
  pub status:               ComplaintStatus,
  pub submitter:            Submitter,
  /// `data:image/...;base64,...` URIs.
  pub images:               Vec<String>,
  pub created_at:           DateTime<Utc>,
  pub updated_at:           DateTime<Utc>,
  pub assigned_to:          Option<String>,
  pub resolution_notes:     Option<String>,
  pub estimated_resolution: Option<DateTime<Utc>>,
  pub history:              Vec<HistoryEntry>,
}

/// Input to [`crate::service::ComplaintService::add_complaint`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewComplaint {
  pub title:       String,
  pub description: String,
  pub category:    String,
  pub subcategory: Option<String>,
  pub location:    String,
  pub landmark:    Option<String>,
  #[serde(default)]
  pub priority:    Priority,
  pub submitter:   Submitter,
  #[serde(default)]
  pub images:      Vec<String>,
}

impl NewComplaint {
  /// Reject submissions the dashboard could not act on.
  pub fn validate(&self) -> Result<()> {
    let required = [
      ("title", &self.title),
      ("description", &self.description),
      ("location", &self.location),
      ("submitter name", &self.submitter.name),
      ("submitter phone", &self.submitter.phone),
    ];
    for (field, value) in required {
      if value.trim().is_empty() {
        return Err(Error::Validation(format!("{field} is required")));
      }
    }

    let category = find_category(&self.category)
      .ok_or_else(|| Error::UnknownCategory(self.category.clone()))?;
    if let Some(sub) = &self.subcategory
      && !category.subcategories.contains(&sub.as_str())
    {
      return Err(Error::Validation(format!(
        "subcategory {sub:?} does not belong to {}",
        category.id
      )));
    }

    for (i, image) in self.images.iter().enumerate() {
      validate_data_uri(image)
        .map_err(|reason| Error::Validation(format!("image {i}: {reason}")))?;
    }
    Ok(())
  }
}

/// Fields staff may change without a status transition.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComplaintPatch {
  pub assigned_to:          Option<String>,
  pub estimated_resolution: Option<DateTime<Utc>>,
  pub priority:             Option<Priority>,
}

// ─── Ids ─────────────────────────────────────────────────────────────────────

/// Build a complaint id for `now`'s year. Collisions are not checked.
pub fn generate_id<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> String {
  let serial: u32 = rng.gen_range(0..1_000_000);
  format!("TSC{}{serial:06}", now.year())
}

/// Whether `id` has the `TSC<year><6 digits>` shape.
pub fn is_valid_id(id: &str) -> bool {
  id.strip_prefix("TSC").is_some_and(|rest| {
    rest.len() == 10 && rest.bytes().all(|b| b.is_ascii_digit())
  })
}

// ─── Stats ───────────────────────────────────────────────────────────────────

/// Aggregate counts for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintStats {
  pub total:       usize,
  pub pending:     usize,
  pub assigned:    usize,
  pub in_progress: usize,
  pub resolved:    usize,
  pub closed:      usize,
  pub by_category: BTreeMap<String, usize>,
  pub by_priority: BTreeMap<Priority, usize>,
}

impl ComplaintStats {
  pub fn tally<'a>(complaints: impl IntoIterator<Item = &'a Complaint>) -> Self {
    complaints.into_iter().fold(Self::default(), |mut stats, c| {
      stats.total += 1;
      match c.status {
        ComplaintStatus::Pending => stats.pending += 1,
        ComplaintStatus::Assigned => stats.assigned += 1,
        ComplaintStatus::InProgress => stats.in_progress += 1,
        ComplaintStatus::Resolved => stats.resolved += 1,
        ComplaintStatus::Closed => stats.closed += 1,
      }
      *stats.by_category.entry(c.category.clone()).or_default() += 1;
      *stats.by_priority.entry(c.priority).or_default() += 1;
      stats
    })
  }

  pub fn count(&self, status: ComplaintStatus) -> usize {
    match status {
      ComplaintStatus::Pending => self.pending,
      ComplaintStatus::Assigned => self.assigned,
      ComplaintStatus::InProgress => self.in_progress,
      ComplaintStatus::Resolved => self.resolved,
      ComplaintStatus::Closed => self.closed,
    }
  }
}

// ─── Categories ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Category {
  pub id:            &'static str,
  pub name:          &'static str,
  pub subcategories: &'static [&'static str],
}

pub const CATEGORIES: &[Category] = &[
  Category {
    id:            "water",
    name:          "Water Supply",
    subcategories: &["no-supply", "contamination", "leakage", "low-pressure"],
  },
  Category {
    id:            "roads",
    name:          "Roads",
    subcategories: &["potholes", "damaged-road", "encroachment", "speed-breaker"],
  },
  Category {
    id:            "electricity",
    name:          "Electricity",
    subcategories: &["power-cut", "voltage", "exposed-wires", "transformer"],
  },
  Category {
    id:            "sanitation",
    name:          "Sanitation",
    subcategories: &["garbage-collection", "public-toilet", "dead-animal"],
  },
  Category {
    id:            "drainage",
    name:          "Drainage",
    subcategories: &["blocked-drain", "overflow", "open-manhole"],
  },
  Category {
    id:            "streetlights",
    name:          "Streetlights",
    subcategories: &["not-working", "damaged-pole", "daytime-on"],
  },
  Category {
    id:            "parks",
    name:          "Parks & Public Spaces",
    subcategories: &["maintenance", "encroachment", "safety"],
  },
  Category { id: "other", name: "Other", subcategories: &[] },
];

pub fn find_category(id: &str) -> Option<&'static Category> {
  CATEGORIES.iter().find(|c| c.id == id)
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn validate_data_uri(uri: &str) -> std::result::Result<(), String> {
  let rest = uri
    .strip_prefix("data:")
    .ok_or_else(|| "not a data URI".to_owned())?;
  let (media_type, payload) = rest
    .split_once(";base64,")
    .ok_or_else(|| "data URI is not base64-encoded".to_owned())?;
  if !media_type.starts_with("image/") {
    return Err(format!("unsupported media type {media_type:?}"));
  }
  B64
    .decode(payload)
    .map_err(|e| format!("invalid base64 payload: {e}"))?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;
  use rand::{SeedableRng, rngs::StdRng};

  fn sample() -> NewComplaint {
    NewComplaint {
      title:       "Burst pipe".into(),
      description: "Water gushing onto the road".into(),
      category:    "water".into(),
      subcategory: Some("leakage".into()),
      location:    "17.3850, 78.4867".into(),
      landmark:    None,
      priority:    Priority::High,
      submitter:   Submitter {
        name:  "Ravi".into(),
        phone: "9876543210".into(),
        email: None,
      },
      images:      vec!["data:image/png;base64,iVBORw0KGgo=".into()],
    }
  }

  #[test]
  fn generated_ids_have_year_and_six_digits() {
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
      let id = generate_id(now, &mut rng);
      assert!(id.starts_with("TSC2026"), "{id}");
      assert!(is_valid_id(&id), "{id}");
    }
  }

  #[test]
  fn is_valid_id_rejects_malformed() {
    assert!(!is_valid_id("TSC2026123"));
    assert!(!is_valid_id("ABC2026123456"));
    assert!(!is_valid_id("TSC20261234X6"));
  }

  #[test]
  fn validate_accepts_well_formed_submission() {
    assert!(sample().validate().is_ok());
  }

  #[test]
  fn validate_rejects_unknown_category() {
    let mut c = sample();
    c.category = "weather".into();
    c.subcategory = None;
    assert!(matches!(c.validate(), Err(Error::UnknownCategory(_))));
  }

  #[test]
  fn validate_rejects_foreign_subcategory() {
    let mut c = sample();
    c.subcategory = Some("potholes".into());
    assert!(matches!(c.validate(), Err(Error::Validation(_))));
  }

  #[test]
  fn validate_rejects_blank_phone() {
    let mut c = sample();
    c.submitter.phone = "  ".into();
    assert!(matches!(c.validate(), Err(Error::Validation(_))));
  }

  #[test]
  fn validate_rejects_non_image_data_uri() {
    let mut c = sample();
    c.images = vec!["data:text/plain;base64,aGVsbG8=".into()];
    assert!(matches!(c.validate(), Err(Error::Validation(_))));

    c.images = vec!["https://example.com/a.png".into()];
    assert!(matches!(c.validate(), Err(Error::Validation(_))));
  }
}
