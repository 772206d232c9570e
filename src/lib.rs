//! Productivity Hub — routines, todos and notes over a hosted backend.

pub mod auth;
pub mod config;
pub mod error;
pub mod hub;
pub mod notes;
pub mod panel;
pub mod routines;
pub mod store;
pub mod supabase;
pub mod todos;
pub mod web;
