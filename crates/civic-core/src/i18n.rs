//! Static translation table for the portal's UI strings.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Language {
  #[default]
  En,
  Hi,
  Te,
}

impl Language {
  pub const ALL: [Self; 3] = [Self::En, Self::Hi, Self::Te];

  fn column(self) -> usize {
    match self {
      Self::En => 0,
      Self::Hi => 1,
      Self::Te => 2,
    }
  }
}

/// `(key, [en, hi, te])`. An empty cell falls back to English.
const TABLE: &[(&str, [&str; 3])] = &[
  ("app.title", ["Citizen Grievance Portal", "नागरिक शिकायत पोर्टल", "పౌర ఫిర్యాదుల పోర్టల్"]),
  ("nav.home", ["Home", "होम", "హోమ్"]),
  ("nav.login", ["Login", "लॉगिन", "లాగిన్"]),
  ("nav.register", ["Register", "पंजीकरण", "నమోదు"]),
  ("nav.logout", ["Logout", "लॉग आउट", "లాగ్ అవుట్"]),
  ("nav.dashboard", ["Dashboard", "डैशबोर्ड", "డాష్‌బోర్డ్"]),
  ("nav.notifications", ["Notifications", "सूचनाएं", "నోటిఫికేషన్లు"]),
  ("nav.register_complaint", ["Register Complaint", "शिकायत दर्ज करें", "ఫిర్యాదు నమోదు"]),
  ("nav.track_complaint", ["Track Complaint", "शिकायत ट्रैक करें", "ఫిర్యాదు స్థితి"]),
  ("complaint.title", ["Title", "शीर्षक", "శీర్షిక"]),
  ("complaint.description", ["Description", "विवरण", "వివరణ"]),
  ("complaint.category", ["Category", "श्रेणी", "వర్గం"]),
  ("complaint.location", ["Location", "स्थान", "స్థానం"]),
  ("complaint.landmark", ["Landmark", "लैंडमार्क", "గుర్తు"]),
  ("complaint.priority", ["Priority", "प्राथमिकता", "ప్రాధాన్యత"]),
  ("complaint.submit", ["Submit Complaint", "शिकायत जमा करें", "ఫిర్యాదు సమర్పించండి"]),
  ("complaint.submitted", [
    "Your complaint has been registered. Complaint ID:",
    "आपकी शिकायत दर्ज हो गई है। शिकायत आईडी:",
    "మీ ఫిర్యాదు నమోదైంది. ఫిర్యాదు ఐడి:",
  ]),
  ("status.pending", ["Pending", "लंबित", "పెండింగ్"]),
  ("status.assigned", ["Assigned", "सौंपा गया", "కేటాయించబడింది"]),
  ("status.in-progress", ["In Progress", "प्रगति में", "పురోగతిలో"]),
  ("status.resolved", ["Resolved", "हल हो गया", "పరిష్కరించబడింది"]),
  ("status.closed", ["Closed", "बंद", "మూసివేయబడింది"]),
  ("priority.low", ["Low", "कम", "తక్కువ"]),
  ("priority.medium", ["Medium", "मध्यम", "మధ్యస్థ"]),
  ("priority.high", ["High", "उच्च", "అధిక"]),
  ("auth.email", ["Email", "ईमेल", "ఇమెయిల్"]),
  ("auth.password", ["Password", "पासवर्ड", "పాస్‌వర్డ్"]),
  ("auth.invalid", [
    "Invalid email or password",
    "अमान्य ईमेल या पासवर्ड",
    "చెల్లని ఇమెయిల్ లేదా పాస్‌వర్డ్",
  ]),
  ("auth.password_mismatch", ["Passwords do not match", "पासवर्ड मेल नहीं खाते", ""]),
  ("chat.title", ["Help Assistant", "सहायक", "సహాయకుడు"]),
  ("chat.placeholder", ["Type your question...", "अपना प्रश्न लिखें...", "మీ ప్రశ్నను టైప్ చేయండి..."]),
  ("notifications.empty", ["No notifications", "कोई सूचना नहीं", "నోటిఫికేషన్లు లేవు"]),
  ("notifications.mark_all", ["Mark all as read", "सभी को पढ़ा हुआ चिह्नित करें", "అన్నీ చదివినట్లు గుర్తించండి"]),
  ("error.not_found", ["Page not found", "पृष्ठ नहीं मिला", "పేజీ కనుగొనబడలేదు"]),
];

/// Look up `key` in `lang`, falling back to English and then to the key.
pub fn translate(lang: Language, key: &str) -> &str {
  let Some((_, row)) = TABLE.iter().find(|(k, _)| *k == key) else {
    return key;
  };
  match row[lang.column()] {
    "" => row[0],
    text => text,
  }
}

/// Every key resolved for `lang`, in table order.
pub fn table(lang: Language) -> Vec<(&'static str, &'static str)> {
  TABLE
    .iter()
    .map(|(key, row)| {
      let text = match row[lang.column()] {
        "" => row[0],
        text => text,
      };
      (*key, text)
    })
    .collect()
}
