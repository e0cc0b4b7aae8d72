// dugout_server: live scorekeeping server for Dugout.
//
// The server keeps exactly one baseball game. Scorers connect over TCP and
// report pitches and plays; every connected session (scorer or observer)
// receives the updated scoreboard after each change. The rules themselves
// live in `dugout_rules` and the wire format in `dugout_protocol`; this crate
// is the plumbing between them and the network.
//
// Module overview:
// - `scorekeeper.rs`: Owner of the single `GameState`. Every mutation goes
//                     through it.
// - `router.rs`:      Maps each decoded client message to game changes and
//                     an ordered list of replies and broadcasts.
// - `registry.rs`:    Connected sessions, each with a writer thread and a
//                     bounded outbound queue, and broadcast with
//                     per-session failure isolation.
// - `server.rs`:      TCP listener, reader threads (one per session), and
//                     the main event loop that owns the router and registry.
// - `audit.rs`:       Write-behind JSON-lines audit trail.
// - `client.rs`:      Blocking TCP client with per-session batter prompting,
//                     used by tools and the integration tests.
// - `config.rs`:      `ServerConfig`.
// - `error.rs`:       `SendError`.
//
// The server can run as a standalone binary (`main.rs`) or be embedded via
// the library API (`start_server`).

pub mod audit;
pub mod client;
pub mod config;
pub mod error;
pub mod registry;
pub mod router;
pub mod scorekeeper;
pub mod server;

pub use config::ServerConfig;
pub use server::{ServerHandle, start_server, start_server_with_audit};
