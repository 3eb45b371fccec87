use crate::model::{ElementKind, Tags};
use crate::seed::Fixture;
use crate::store::traits::Store;

/// What the demo data contains, for the startup log
#[derive(Debug, Clone, PartialEq)]
pub struct SeedSummary {
    pub users: Vec<String>,
    pub relations: usize,
}

fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Load a small bus network: stops, street ways, two route variants under
/// a route master, a multipolygon and one deleted relation. Every demo
/// user logs in with [`crate::seed::FIXTURE_PASSWORD`].
pub async fn load_seed_data<S: Store>(store: &S) -> SeedSummary {
    store
        .write(|dataset| {
            let mut fx = Fixture::with_dataset(std::mem::take(dataset));
            let summary = build_network(&mut fx);
            *dataset = fx.into_dataset();
            summary
        })
        .await
}

fn build_network(fx: &mut Fixture) -> SeedSummary {
    let mapper = fx.user("mapper");
    let private = fx.private_user("private_mapper");

    let stops: Vec<_> = [
        (51.5007, -0.1246, "Westminster"),
        (51.5033, -0.1195, "Waterloo Bridge"),
        (51.5080, -0.1281, "Trafalgar Square"),
        (51.5136, -0.1365, "Oxford Circus"),
    ]
    .into_iter()
    .map(|(lat, lon, name)| {
        fx.tagged_node(lat, lon, tags(&[("highway", "bus_stop"), ("name", name)]))
    })
    .collect();

    let corners: Vec<_> = [(51.5020, -0.1220), (51.5060, -0.1240), (51.5110, -0.1320)]
        .into_iter()
        .map(|(lat, lon)| fx.node(lat, lon))
        .collect();

    let bridge = fx.tagged_way(
        &[stops[0], corners[0], stops[1]],
        tags(&[("highway", "primary"), ("name", "Westminster Bridge Road")]),
    );
    let strand = fx.tagged_way(
        &[stops[1], corners[1], stops[2]],
        tags(&[("highway", "primary"), ("name", "Strand")]),
    );
    let regent = fx.tagged_way(
        &[stops[2], corners[2], stops[3]],
        tags(&[("highway", "primary"), ("name", "Regent Street")]),
    );

    let outbound = fx
        .relation()
        .by(&mapper)
        .member(ElementKind::Node, stops[0], "stop")
        .member(ElementKind::Way, bridge, "")
        .member(ElementKind::Node, stops[1], "stop")
        .member(ElementKind::Way, strand, "")
        .member(ElementKind::Node, stops[2], "stop")
        .member(ElementKind::Way, regent, "")
        .member(ElementKind::Node, stops[3], "stop")
        .tag("type", "route")
        .tag("route", "bus")
        .tag("ref", "24")
        .tag("name", "24: Westminster => Oxford Circus")
        .build();
    let inbound = fx
        .relation()
        .by(&mapper)
        .member(ElementKind::Node, stops[3], "stop")
        .member(ElementKind::Way, regent, "")
        .member(ElementKind::Node, stops[2], "stop")
        .member(ElementKind::Way, strand, "")
        .member(ElementKind::Node, stops[1], "stop")
        .member(ElementKind::Way, bridge, "")
        .member(ElementKind::Node, stops[0], "stop")
        .tag("type", "route")
        .tag("route", "bus")
        .tag("ref", "24")
        .tag("name", "24: Oxford Circus => Westminster")
        .build();
    fx.relation()
        .by(&mapper)
        .member(ElementKind::Relation, outbound, "")
        .member(ElementKind::Relation, inbound, "")
        .tag("type", "route_master")
        .tag("route_master", "bus")
        .tag("ref", "24")
        .build();

    let ring: Vec<_> = [(51.5070, -0.1290), (51.5070, -0.1270), (51.5085, -0.1270), (51.5085, -0.1290)]
        .into_iter()
        .map(|(lat, lon)| fx.node(lat, lon))
        .collect();
    let outline = fx.way(&[ring[0], ring[1], ring[2], ring[3], ring[0]]);
    fx.relation()
        .by(&private)
        .member(ElementKind::Way, outline, "outer")
        .tag("type", "multipolygon")
        .tag("place", "square")
        .tag("name", "Trafalgar Square")
        .build();

    fx.relation()
        .by(&mapper)
        .member(ElementKind::Node, stops[0], "stop")
        .tag("type", "route")
        .tag("note", "withdrawn")
        .deleted()
        .build();

    let summary = SeedSummary {
        users: vec![mapper.display_name, private.display_name],
        relations: 5,
    };
    log::info!(
        "seeded {} relations for users {}",
        summary.relations,
        summary.users.join(", ")
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::relation_queries;
    use crate::model::ElementRef;
    use crate::store::{EntityStore, MemoryStore};

    #[tokio::test]
    async fn seed_builds_a_route_network() {
        let store = MemoryStore::new(50);
        let summary = load_seed_data(&store).await;
        assert_eq!(summary.relations, 5);

        let (masters, max) = store
            .read(|ds| {
                let masters = relation_queries::for_member(ds, ElementRef::relation(1));
                (masters.relations.len(), ds.max_changeset_elements())
            })
            .await;
        assert_eq!(masters, 1);
        assert_eq!(max, 50);
    }

    #[tokio::test]
    async fn seeded_deleted_relation_reads_as_gone() {
        let store = MemoryStore::default();
        load_seed_data(&store).await;
        let gone = store.read(|ds| relation_queries::read(ds, 5).is_err()).await;
        assert!(gone);
    }
}
