// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordered, id-keyed message log.

use std::collections::HashMap;

use chatline_core::Message;

/// What [`MessageLog::upsert`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Replaced,
}

/// The conversation as the user sees it.
///
/// Insertion order is preserved; a message whose id is already present is
/// replaced in place, which is how one growing agent turn stays a single
/// entry.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
    index: HashMap<String, usize>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, message: Message) -> Upsert {
        match self.index.get(&message.id) {
            Some(&position) => {
                self.messages[position] = message;
                Upsert::Replaced
            }
            None => {
                self.index.insert(message.id.clone(), self.messages.len());
                self.messages.push(message);
                Upsert::Inserted
            }
        }
    }

    /// Removes a message, keeping the order of the rest.
    pub fn remove(&mut self, id: &str) -> Option<Message> {
        let position = self.index.remove(id)?;
        let removed = self.messages.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.index.get(id).map(|&i| &self.messages[i])
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatline_core::Role;

    #[test]
    fn upsert_appends_new_ids() {
        let mut log = MessageLog::new();
        assert!(log.is_empty());
        assert_eq!(log.upsert(Message::with_id("a", Role::User, "hi")), Upsert::Inserted);
        assert_eq!(log.upsert(Message::with_id("b", Role::Agent, "")), Upsert::Inserted);
        assert_eq!(log.len(), 2);
        assert_eq!(log.last().unwrap().id, "b");
    }

    #[test]
    fn upsert_replaces_in_place() {
        let mut log = MessageLog::new();
        log.upsert(Message::with_id("a", Role::User, "hi"));
        log.upsert(Message::with_id("b", Role::Agent, "Hel"));
        log.upsert(Message::with_id("c", Role::User, "later"));
        assert_eq!(log.upsert(Message::with_id("b", Role::Agent, "Hello")), Upsert::Replaced);

        let ids: Vec<&str> = log.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(log.get("b").unwrap().content, "Hello");
        assert_eq!(log.messages().len(), 3);
    }

    #[test]
    fn remove_keeps_order_and_index() {
        let mut log = MessageLog::new();
        log.upsert(Message::with_id("a", Role::User, "hi"));
        log.upsert(Message::with_id("b", Role::Agent, "partial"));
        log.upsert(Message::with_id("c", Role::User, "next"));

        assert_eq!(log.remove("b").unwrap().content, "partial");
        assert!(log.remove("b").is_none());
        let ids: Vec<&str> = log.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
        assert_eq!(log.get("c").unwrap().content, "next");
        assert_eq!(log.upsert(Message::with_id("c", Role::User, "edited")), Upsert::Replaced);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn get_unknown_id_is_none() {
        assert!(MessageLog::new().get("nope").is_none());
    }
}
