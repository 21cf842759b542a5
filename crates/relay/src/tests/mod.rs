//! Komponentenuebergreifende Tests des Relays
//!
//! Treiben den verdrahteten `RelayState` ueber den Dispatcher, so wie es
//! die Verbindungs-Tasks im Betrieb tun.
