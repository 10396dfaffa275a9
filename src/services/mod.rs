// ABOUTME: Business-logic services sitting between HTTP routes and storage
// ABOUTME: Currently hosts the message/analysis orchestration flow

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sana Health

pub mod message_orchestration;

pub use message_orchestration::{post_user_message, ConversationLocks, MessageDispatch};
