mod http;
mod supabase;

pub use http::{check_response, read_json};
pub use supabase::SupabaseClient;
