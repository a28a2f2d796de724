//! HTTP API over the member/team/item repositories
//!
//! ```bash
//! # in-memory, seeded with member1..member3
//! cargo run --example members_api
//!
//! # postgres
//! DATAMAP_CONFIG=config.yaml cargo run --example members_api --features postgres
//!
//! curl http://127.0.0.1:3000/members/v1/1
//! curl "http://127.0.0.1:3000/members?page=0&size=2&sort=username:desc"
//! ```

use datamap::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("info,datamap=debug,tower_http=debug");

    let config = AppConfig::from_env()?;
    let addr = config.server.address();

    println!("🚀 Members API on http://{}", addr);
    println!("   GET    /members?page=&size=&sort=");
    println!("   GET    /members/v1/{{id}}  /members/v2/{{id}}");
    println!("   GET    /members/search?username=&min_age=");
    println!("   GET    /members/by-age/{{age}}");
    println!("   POST   /members   PUT|DELETE /members/{{id}}");
    println!("   POST   /teams     GET|DELETE /teams/{{id}}");
    println!("   POST   /items     GET /items/{{id}}");

    ServerBuilder::new().with_config(config).serve(&addr).await
}
