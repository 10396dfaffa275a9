// ABOUTME: Test helper module exports for integration tests
// ABOUTME: Re-exports the Axum request helper shared across test binaries

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sana Health

pub mod axum_test;
