//! Shared test harness modules for the trafficsync CLI.

use super::*;

mod helpers;
mod steps;
mod unit;
