//! The scripted help assistant.
//!
//! Replies are chosen by [`respond`]: first an FAQ whose question keywords
//! appear in the input, then the first matching intent keyword list, then a
//! fallback. [`Conversation`] wraps that in the two-step turn the chat widget
//! shows: the user's message is received, the assistant "types", the reply
//! is emitted.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── FAQ table ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize)]
pub struct FaqEntry {
  pub question: &'static str,
  pub answer:   &'static str,
  pub category: &'static str,
}

pub const FAQS: &[FaqEntry] = &[
  FaqEntry {
    question: "How do I register a new complaint?",
    answer:   "Open 'Register Complaint', choose a category, describe the issue, add the \
               location and optionally photos, then submit. You will receive a complaint \
               ID starting with TSC.",
    category: "registration",
  },
  FaqEntry {
    question: "How can I track my complaint status?",
    answer:   "Go to 'Track Complaint' and enter your complaint ID or the phone number \
               you used while registering.",
    category: "tracking",
  },
  FaqEntry {
    question: "How long does it take to resolve a complaint?",
    answer:   "Most complaints are resolved within 3 to 7 working days depending on the \
               category and priority. High-priority issues are taken up first.",
    category: "timing",
  },
  FaqEntry {
    question: "Can I upload photos with my complaint?",
    answer:   "Yes. You can attach photos while registering; they help officials locate \
               and assess the problem faster.",
    category: "photos",
  },
  FaqEntry {
    question: "Which categories are supported?",
    answer:   "Water supply, roads, electricity, sanitation, drainage, streetlights, \
               parks and public spaces, and other civic issues.",
    category: "registration",
  },
  FaqEntry {
    question: "Is an account mandatory?",
    answer:   "No. Anyone can register a complaint with a phone number. Creating an \
               account lets you see notifications about your complaints.",
    category: "account",
  },
  FaqEntry {
    question: "How do I switch language?",
    answer:   "Use the language selector at the top of the page to switch between \
               English, Hindi and Telugu.",
    category: "general",
  },
  FaqEntry {
    question: "Is my personal information safe?",
    answer:   "Your details are only shared with the officials handling your complaint.",
    category: "privacy",
  },
];

/// Words too common to identify an FAQ on their own.
const STOP_WORDS: &[&str] = &[
  "about", "complaint", "complaints", "does", "from", "have", "long",
  "need", "take", "that", "their", "there", "they", "this", "what", "when",
  "where", "which", "will", "with", "your",
];

// ─── Intents ─────────────────────────────────────────────────────────────────

/// Checked top to bottom; the first list with a keyword in the input wins.
const INTENTS: &[(&str, &[&str], &str)] = &[
  (
    "registration",
    &["register", "file", "lodge", "submit", "new complaint", "report"],
    "To register a complaint, open 'Register Complaint', fill in the details and \
     submit. Keep the complaint ID you receive for tracking.",
  ),
  (
    "tracking",
    &["track", "status", "check", "progress", "update"],
    "You can track your complaint from 'Track Complaint' using the complaint ID or \
     your registered phone number.",
  ),
  (
    "timing",
    &["how long", "time", "days", "when will", "delay"],
    "Complaints are usually resolved within 3 to 7 working days. You will be notified \
     when the status changes.",
  ),
  (
    "photos",
    &["photo", "image", "picture", "upload", "camera"],
    "You can attach photos while registering a complaint. Clear pictures help \
     officials act faster.",
  ),
  (
    "location",
    &["location", "address", "map", "gps", "where"],
    "Enter the address and a nearby landmark, or use 'Use my location' to capture \
     coordinates automatically.",
  ),
  (
    "contact",
    &["contact", "phone", "call", "helpline", "email", "officer"],
    "You can reach the helpdesk on the toll-free number 1800-425-0000 (9 AM to 6 PM) \
     or write to help@tsc.gov.in.",
  ),
  (
    "thanks",
    &["thank", "thanks", "great", "helpful"],
    "You're welcome! Is there anything else I can help you with?",
  ),
  (
    "emergency",
    &["emergency", "urgent", "danger", "fire", "accident", "electrocution"],
    "For emergencies please call 100 (police), 101 (fire) or 108 (ambulance) \
     immediately. This portal is for non-emergency civic issues.",
  ),
];

pub const FALLBACK_REPLY: &str = "I'm sorry, I didn't quite understand that. You can \
  ask me how to register a complaint, track its status, how long resolution takes, \
  or how to contact the helpdesk.";

pub const GREETING: &str = "Hello! I'm the portal help assistant. How can I help you today?";

pub const QUICK_REPLIES: &[&str] = &[
  "How do I register a complaint?",
  "Track my complaint",
  "How long will it take?",
  "Contact helpline",
];

/// Share of bot replies that carry quick-reply suggestions.
pub const DEFAULT_QUICK_REPLY_RATE: f64 = 0.3;

fn keywords(question: &str) -> impl Iterator<Item = String> + '_ {
  question
    .split(|c: char| !c.is_alphanumeric())
    .map(str::to_lowercase)
    .filter(|w| w.chars().count() > 3 && !STOP_WORDS.contains(&w.as_str()))
}

/// Pick the canned reply for `input`.
pub fn respond(input: &str) -> &'static str {
  let text = input.to_lowercase();

  if let Some(faq) = FAQS
    .iter()
    .find(|faq| keywords(faq.question).any(|k| text.contains(&k)))
  {
    tracing::debug!(category = faq.category, "chat matched faq");
    return faq.answer;
  }

  if let Some((intent, _, reply)) = INTENTS
    .iter()
    .find(|(_, words, _)| words.iter().any(|w| text.contains(w)))
  {
    tracing::debug!(intent, "chat matched intent");
    return *reply;
  }

  FALLBACK_REPLY
}

// ─── Conversation ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatState {
  AwaitingInput,
  Typing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
  User,
  Bot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
  pub id:            Uuid,
  pub sender:        Sender,
  pub text:          String,
  pub timestamp:     DateTime<Utc>,
  pub quick_replies: Vec<String>,
}

impl ChatMessage {
  fn new(sender: Sender, text: impl Into<String>, quick_replies: Vec<String>) -> Self {
    Self {
      id: Uuid::new_v4(),
      sender,
      text: text.into(),
      timestamp: Utc::now(),
      quick_replies,
    }
  }
}

/// One visitor's chat transcript plus the turn state.
///
/// The random source only decides whether quick replies are attached; seed it
/// for reproducible transcripts.
pub struct Conversation<R> {
  rng:              R,
  quick_reply_rate: f64,
  state:            ChatState,
  transcript:       Vec<ChatMessage>,
}

impl<R: Rng> Conversation<R> {
  /// Start a conversation with the greeting (which always offers quick
  /// replies).
  pub fn new(rng: R) -> Self {
    Self {
      rng,
      quick_reply_rate: DEFAULT_QUICK_REPLY_RATE,
      state: ChatState::AwaitingInput,
      transcript: vec![ChatMessage::new(Sender::Bot, GREETING, quick_replies())],
    }
  }

  /// Override the quick-reply share; clamped to `0.0..=1.0`. A non-finite
  /// rate keeps [`DEFAULT_QUICK_REPLY_RATE`].
  pub fn with_quick_reply_rate(mut self, rate: f64) -> Self {
    self.quick_reply_rate = if rate.is_finite() {
      rate.clamp(0.0, 1.0)
    } else {
      DEFAULT_QUICK_REPLY_RATE
    };
    self
  }

  pub fn state(&self) -> ChatState { self.state }

  pub fn transcript(&self) -> &[ChatMessage] { &self.transcript }

  /// Record the user's message and start "typing".
  pub fn receive(&mut self, text: &str) -> Result<&ChatMessage> {
    if self.state == ChatState::Typing {
      return Err(Error::ChatBusy);
    }
    let text = text.trim();
    if text.is_empty() {
      return Err(Error::EmptyMessage);
    }
    self.transcript.push(ChatMessage::new(Sender::User, text, Vec::new()));
    self.state = ChatState::Typing;
    Ok(self.last())
  }

  /// Answer the pending user message and return to awaiting input.
  pub fn emit_reply(&mut self) -> Result<&ChatMessage> {
    if self.state != ChatState::Typing {
      return Err(Error::ChatIdle);
    }
    let input = self
      .transcript
      .iter()
      .rev()
      .find(|m| m.sender == Sender::User)
      .map(|m| m.text.clone())
      .ok_or(Error::ChatIdle)?;

    let suggestions = if self.rng.gen_bool(self.quick_reply_rate) {
      quick_replies()
    } else {
      Vec::new()
    };
    self
      .transcript
      .push(ChatMessage::new(Sender::Bot, respond(&input), suggestions));
    self.state = ChatState::AwaitingInput;
    Ok(self.last())
  }

  fn last(&self) -> &ChatMessage {
    // The transcript starts with the greeting and only grows.
    &self.transcript[self.transcript.len() - 1]
  }
}

fn quick_replies() -> Vec<String> {
  QUICK_REPLIES.iter().map(|s| (*s).to_owned()).collect()
}
