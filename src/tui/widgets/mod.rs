pub mod network_view;
