use memlab::{Block, BlockAllocator, BlockState, FirstFitAllocator, SimError};
use proptest::prelude::*;

fn assert_tiles_arena(alloc: &FirstFitAllocator) {
    let blocks = alloc.blocks();
    assert_eq!(blocks.first().map(|b| b.offset), Some(0));
    for pair in blocks.windows(2) {
        assert_eq!(pair[0].end(), pair[1].offset, "gap or overlap in {:?}", blocks);
        assert!(!(pair[0].is_free() && pair[1].is_free()), "unmerged free neighbours in {:?}", blocks);
    }
    assert_eq!(blocks.iter().map(|b| b.length).sum::<usize>(), alloc.capacity());
}

#[test]
fn test_allocate_then_merge_scenario() {
    let mut alloc = FirstFitAllocator::new(1024).unwrap();

    let offsets: Vec<usize> = [100, 200, 50].iter().map(|&n| alloc.allocate(n).unwrap().offset).collect();
    assert_eq!(offsets, vec![0, 100, 300]);
    assert_eq!(alloc.blocks().last(), Some(&Block { offset: 350, length: 674, state: BlockState::Free }));

    alloc.free(100).unwrap();
    alloc.free(0).unwrap();

    assert_eq!(
        alloc.blocks(),
        vec![
            Block { offset: 0, length: 300, state: BlockState::Free },
            Block { offset: 300, length: 50, state: BlockState::Occupied },
            Block { offset: 350, length: 674, state: BlockState::Free },
        ]
    );
    assert_tiles_arena(&alloc);
}

#[test]
fn test_waste_is_slack_of_selected_hole() {
    let mut alloc = FirstFitAllocator::new(1024).unwrap();
    assert_eq!(alloc.allocate(100).unwrap().waste, 924);
    assert_eq!(alloc.allocate(200).unwrap().waste, 724);
    assert_eq!(alloc.total_waste(), 924 + 724);
}

#[test]
fn test_out_of_memory_when_fragmented() {
    let mut alloc = FirstFitAllocator::new(100).unwrap();
    let a = alloc.allocate(40).unwrap();
    alloc.allocate(20).unwrap();
    alloc.free(a.offset).unwrap();

    assert_eq!(alloc.free_bytes(), 80);
    assert_eq!(alloc.largest_free(), 40);
    assert!(matches!(alloc.allocate(50), Err(SimError::OutOfMemory { requested: 50 })));
}

#[derive(Debug, Clone)]
enum Op {
    Alloc(usize),
    Free(usize),
}

proptest! {
    #[test]
    fn test_blocks_always_tile_the_arena(ops in proptest::collection::vec(
        prop_oneof![
            (1usize..200).prop_map(Op::Alloc),
            any::<usize>().prop_map(Op::Free),
        ],
        1..80
    )) {
        let mut alloc = FirstFitAllocator::new(1024).unwrap();
        let mut live: Vec<usize> = Vec::new();

        for op in ops {
            match op {
                Op::Alloc(size) => {
                    if let Ok(a) = alloc.allocate(size) {
                        live.push(a.offset);
                    }
                }
                Op::Free(pick) => {
                    if !live.is_empty() {
                        let offset = live.swap_remove(pick % live.len());
                        prop_assert!(alloc.free(offset).is_ok());
                    }
                }
            }
            assert_tiles_arena(&alloc);
        }

        for offset in live {
            prop_assert!(alloc.free(offset).is_ok());
        }
        prop_assert_eq!(alloc.blocks(), vec![Block { offset: 0, length: 1024, state: BlockState::Free }]);
    }
}
