//! Walk through the repository features against the in-memory store

use datamap::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("info");

    println!("🚀 datamap-rs repository tour\n");

    let repositories = Repositories::in_memory();
    let members = &repositories.members;

    // === Cascade save ===
    let mut team_a = Team::new("teamA");
    let mut team_b = Team::new("teamB");
    Member::with_team("member1", 10, &mut team_a);
    Member::with_team("member2", 20, &mut team_a);
    Member::with_team("member3", 30, &mut team_b);
    Member::with_team("member4", 40, &mut team_b);
    let team_a = repositories.teams.save(team_a).await?;
    let team_b = repositories.teams.save(team_b).await?;
    println!(
        "✅ Saved {} ({} members) and {} ({} members)",
        team_a.name,
        team_a.members.len(),
        team_b.name,
        team_b.members.len()
    );

    // === Derived queries ===
    let older = members
        .find_by_username_and_age_greater_than("member3", 15)
        .await?;
    println!("🔎 member3 older than 15: {:?}", older);

    let by_names = members
        .find_by_names(&["member1".to_string(), "member4".to_string()])
        .await?;
    println!("🔎 by names: {:?}", by_names);

    let one = members.find_member_by_username("member2").await?;
    println!("🔎 single result: {:?}", one);

    match members.find_member_by_username("nobody").await {
        Err(e) => println!("⚠️  single result for unknown user: {}", e),
        Ok(m) => println!("unexpected: {:?}", m),
    }

    for dto in members.find_member_dto().await? {
        println!("📋 {} in {:?}", dto.username, dto.team_name);
    }

    // === Paging ===
    for username in ["member5", "member6", "member7"] {
        members.save(Member::with_age(username, 10)).await?;
    }
    let request = PageRequest::of(0, 3).with_sort(Sort::by(Direction::Desc, ["username"]));
    let page = members.find_by_age(10, &request).await?;
    println!(
        "\n📄 page {}/{}: {} of {} elements, has next: {}",
        page.number() + 1,
        page.total_pages(),
        page.number_of_elements(),
        page.total_elements(),
        page.has_next()
    );
    let dtos = page.map(|m| (m.id, m.username));
    println!("   {:?}", dtos.content());

    let slice = members.find_slice_by_age(10, &request).await?;
    println!("📄 slice of {}, has next: {}", slice.content.len(), slice.has_next);

    // === Bulk update ===
    let updated = members.bulk_age_plus(20).await?;
    println!("\n⬆️  bulk update touched {} members", updated);

    // === Fetch join and projections ===
    for row in members.find_member_fetch_join().await? {
        println!("🔗 {} -> {:?}", row.member.username, row.team_name());
    }
    let nested: Vec<NestedClosedProjection> =
        members.find_projections_by_username("member1").await?;
    println!("🧩 nested projection: {:?}", nested);

    // === Hints ===
    let read_only = members.find_read_only_by_username("member1").await?;
    println!("\n🔒 read-only: {:?}", read_only);
    let locked = members.find_lock_by_username("member1").await?;
    println!("🔒 locked: {:?}", locked);

    // === Specifications and query by example ===
    let spec = MemberSpecification::username("member1").and(MemberSpecification::team_name("teamA"));
    println!("\n🧮 specification: {:?}", members.find_all_matching(&spec).await?);

    let mut probe = Member::new("member3");
    probe.team_id = team_b.id;
    let example = Example::with_matcher(probe, ExampleMatcher::matching().with_ignore_paths(["age"]));
    println!("🧮 example: {:?}", members.find_all_by_example(&example).await?);

    // === Native queries ===
    println!("\n🗄️  native: {:?}", members.find_by_native_query("member4").await?);
    let projected = members
        .find_by_native_projection(&PageRequest::of(0, 10))
        .await?;
    println!("🗄️  native projection: {} rows", projected.total_elements());

    // === Items with assigned ids ===
    let item = repositories.items.save(Item::new("A")).await?;
    println!("\n📦 item {} created at {:?}", item.id, item.created_datetime);
    if let Err(e) = repositories.items.save(Item::new("A")).await {
        println!("⚠️  duplicate item: {}", e);
    }

    println!("\n✨ Done");
    Ok(())
}
