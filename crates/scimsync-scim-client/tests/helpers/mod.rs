pub mod mock_downstream;
