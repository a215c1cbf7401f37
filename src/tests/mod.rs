//! Scenario tests that run whole layouts through loading, scheduling and
//! rendering. Per-module unit tests live next to the code they cover.
