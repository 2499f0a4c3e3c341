pub mod healing_client;
