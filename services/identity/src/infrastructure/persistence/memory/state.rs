//! 进程内存储状态

use std::collections::HashMap;

use agora_common::UserId;
use agora_errors::{AppError, AppResult};
use chrono::{DateTime, Utc};

use crate::domain::user::{User, VerificationToken};

#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryState {
    pub(crate) users: HashMap<UserId, User>,
    pub(crate) tokens: HashMap<String, VerificationToken>,
}

impl MemoryState {
    pub(crate) fn find_user(&self, predicate: impl Fn(&User) -> bool) -> Option<User> {
        self.users.values().find(|u| predicate(u)).cloned()
    }

    pub(crate) fn insert_user(&mut self, user: &User) -> AppResult<()> {
        for existing in self.users.values() {
            if existing.id == user.id {
                return Err(AppError::conflict("Duplicate entry violates unique constraint"));
            }
            if existing.username == user.username {
                return Err(AppError::conflict("Username already taken"));
            }
            if existing.email == user.email {
                return Err(AppError::conflict("Email already registered"));
            }
        }

        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    pub(crate) fn update_user(&mut self, user: &User) -> AppResult<()> {
        let clash = self.users.values().any(|u| {
            u.id != user.id && (u.username == user.username || u.email == user.email)
        });
        if clash {
            return Err(AppError::conflict("Duplicate entry violates unique constraint"));
        }

        match self.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(AppError::not_found("User not found")),
        }
    }

    pub(crate) fn insert_token(&mut self, token: &VerificationToken) -> AppResult<()> {
        if !self.users.contains_key(&token.user_id) {
            return Err(AppError::database(
                "Verification token references an unknown user",
            ));
        }
        if self.tokens.contains_key(&token.token) {
            return Err(AppError::conflict("Duplicate entry violates unique constraint"));
        }

        self.tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    pub(crate) fn mark_consumed(&mut self, token: &str, at: DateTime<Utc>) -> bool {
        match self.tokens.get_mut(token) {
            Some(record) if record.consumed_at.is_none() => {
                record.consumed_at = Some(at);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn delete_unconsumed_for_user(&mut self, user_id: &UserId) -> u64 {
        let before = self.tokens.len();
        self.tokens
            .retain(|_, t| &t.user_id != user_id || t.consumed_at.is_some());
        (before - self.tokens.len()) as u64
    }

    pub(crate) fn delete_expired(&mut self, now: DateTime<Utc>) -> u64 {
        let before = self.tokens.len();
        self.tokens.retain(|_, t| !t.is_expired(now));
        (before - self.tokens.len()) as u64
    }
}
