pub mod dispatcher;
pub mod fetcher;
pub mod notifier;
pub mod pipeline;
pub mod scanner;
pub mod temp_files;
