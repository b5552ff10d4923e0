use touchmap::Touch;

#[derive(Debug, Clone, Copy)]
pub struct FuzzTouch(pub Touch);

impl<'a> arbitrary::Arbitrary<'a> for FuzzTouch {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        match u.int_in_range(0..=2)? {
            0 => Ok(FuzzTouch(Touch::None)),
            1 => Ok(FuzzTouch(Touch::AsOld)),
            2 => Ok(FuzzTouch(Touch::AsNew)),
            _ => unreachable!(),
        }
    }
}

#[derive(Debug)]
pub enum MapOperation {
    Set(u8, u8, FuzzTouch),
    Get(u8, FuzzTouch),
    Peek(u8),
    Remove(u8),
    Shift,
    Clear,
    TrimOld(u8),
    SetLimit(u8),
    SetRatio(u8),
    RoundTrip,
}

impl<'a> arbitrary::Arbitrary<'a> for MapOperation {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        match u.int_in_range(0..=9)? {
            0 => Ok(MapOperation::Set(
                u.arbitrary()?,
                u.arbitrary()?,
                u.arbitrary()?,
            )),
            1 => Ok(MapOperation::Get(u.arbitrary()?, u.arbitrary()?)),
            2 => Ok(MapOperation::Peek(u.arbitrary()?)),
            3 => Ok(MapOperation::Remove(u.arbitrary()?)),
            4 => Ok(MapOperation::Shift),
            5 => Ok(MapOperation::Clear),
            6 => Ok(MapOperation::TrimOld(u.arbitrary()?)),
            7 => Ok(MapOperation::SetLimit(u.arbitrary()?)),
            8 => Ok(MapOperation::SetRatio(u.arbitrary()?)),
            9 => Ok(MapOperation::RoundTrip),
            _ => unreachable!(),
        }
    }
}
